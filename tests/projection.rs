use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use arachne::geometry::geo_traits::DistanceTo;
use arachne::geometry::primitives::{Point, Polygon};
use arachne::hardware::{FocalPlane, FocalPlaneRecord};
use arachne::projection::{radial_ang2dist, Tile, TileTable};

/// Single-positioner model; the projection APIs only need the plate.
fn plate() -> FocalPlane {
    let rec = FocalPlaneRecord {
        timestamp: "2026-08-02T00:00:00".to_string(),
        location: vec![0],
        petal: vec![0],
        device: vec![0],
        slitblock: vec![0],
        blockfiber: vec![0],
        fiber: vec![0],
        device_type: vec!["POS".to_string()],
        x_mm: vec![0.0],
        y_mm: vec![0.0],
        status: vec![0],
        theta_offset: vec![0.0],
        theta_min: vec![-180.0],
        theta_max: vec![180.0],
        theta_arm: vec![3.0],
        phi_offset: vec![0.0],
        phi_min: vec![0.0],
        phi_max: vec![180.0],
        phi_arm: vec![3.0],
        ps_radius: vec![0.0],
        ps_theta: vec![0.0],
        excl_theta: vec![Polygon::empty()],
        excl_phi: vec![Polygon::empty()],
        excl_gfa: vec![Polygon::empty()],
        excl_petal: vec![Polygon::empty()],
    };
    FocalPlane::new(rec).unwrap()
}

#[test]
fn tile_center_maps_to_plate_origin() {
    let fp = plate();

    let origin = fp.radec2xy(
        &Tile {
            ra: 0.0,
            dec: 0.0,
            theta: 0.0,
        },
        0.0,
        0.0,
    );
    assert!(origin.sq_norm().sqrt() <= 1e-9);

    let centered = fp.radec2xy(
        &Tile {
            ra: 10.0,
            dec: 0.0,
            theta: 0.0,
        },
        10.0,
        0.0,
    );
    assert!(centered.sq_norm().sqrt() <= 1e-9);
}

#[test]
fn ra_offset_maps_to_minus_x() {
    let fp = plate();
    let tile = Tile {
        ra: 0.0,
        dec: 0.0,
        theta: 0.0,
    };

    // the plate is oriented with +xfocal = -RA
    let xy = fp.radec2xy(&tile, 1.0, 0.0);
    let expected = -radial_ang2dist(1f64.to_radians());
    assert!((xy.0 - expected).abs() <= 1e-6, "x = {}", xy.0);
    assert!(xy.1.abs() <= 1e-6, "y = {}", xy.1);
}

#[test]
fn dec_offset_maps_to_plus_y() {
    let fp = plate();
    let tile = Tile {
        ra: 0.0,
        dec: 0.0,
        theta: 0.0,
    };

    let xy = fp.radec2xy(&tile, 0.0, 1.0);
    let expected = radial_ang2dist(1f64.to_radians());
    assert!(xy.0.abs() <= 1e-6, "x = {}", xy.0);
    assert!((xy.1 - expected).abs() <= 1e-6, "y = {}", xy.1);
}

#[test]
fn field_rotation_spins_the_plate() {
    let fp = plate();
    let plain = Tile {
        ra: 0.0,
        dec: 0.0,
        theta: 0.0,
    };
    let rotated = Tile {
        ra: 0.0,
        dec: 0.0,
        theta: 90.0,
    };

    let a = fp.radec2xy(&plain, 1.0, 0.0);
    let b = fp.radec2xy(&rotated, 1.0, 0.0);
    // a quarter field rotation maps (x, y) to (-y, x)
    assert!((b.0 + a.1).abs() <= 1e-6);
    assert!((b.1 - a.0).abs() <= 1e-6);
}

#[test]
fn radec_round_trip_on_the_plate() {
    let fp = plate();
    let tile = Tile {
        ra: 150.0,
        dec: 30.0,
        theta: 5.0,
    };

    let mut rng = SmallRng::seed_from_u64(0);
    for _ in 0..500 {
        let ra = tile.ra + rng.gen_range(-1.0..1.0);
        let dec = tile.dec + rng.gen_range(-1.0..1.0);

        let xy = fp.radec2xy(&tile, ra, dec);
        let (ra_back, dec_back) = fp.xy2radec(&tile, xy);

        assert!(
            (ra_back - ra).abs() <= 1e-6,
            "ra {ra} -> {ra_back} via {xy:?}"
        );
        assert!(
            (dec_back - dec).abs() <= 1e-6,
            "dec {dec} -> {dec_back} via {xy:?}"
        );
    }
}

#[test]
fn xy_round_trip_on_the_plate() {
    let fp = plate();
    let tile = Tile {
        ra: 42.0,
        dec: -15.0,
        theta: -3.0,
    };

    let mut rng = SmallRng::seed_from_u64(1);
    for _ in 0..500 {
        let r = rng.gen_range(0.5..400.0);
        let ang = rng.gen_range(0.0..std::f64::consts::TAU);
        let xy = Point(r * ang.cos(), r * ang.sin());

        let (ra, dec) = fp.xy2radec(&tile, xy);
        let back = fp.radec2xy(&tile, ra, dec);

        assert!(back.distance_to(&xy) <= 1e-6, "{xy:?} -> {back:?}");
    }
}

#[test]
fn batch_projection_matches_scalar_and_preserves_order() {
    let fp = plate();
    let tile = Tile {
        ra: 150.0,
        dec: 30.0,
        theta: 0.0,
    };

    let mut rng = SmallRng::seed_from_u64(2);
    let ra: Vec<f64> = (0..200).map(|_| tile.ra + rng.gen_range(-1.0..1.0)).collect();
    let dec: Vec<f64> = (0..200).map(|_| tile.dec + rng.gen_range(-1.0..1.0)).collect();

    for threads in [0, 1, 4] {
        let xy = fp.radec2xy_multi(&tile, &ra, &dec, threads);
        assert_eq!(xy.len(), ra.len());
        for (i, p) in xy.iter().enumerate() {
            let scalar = fp.radec2xy(&tile, ra[i], dec[i]);
            assert!(p.distance_to(&scalar) <= 1e-12);
        }

        let radec = fp.xy2radec_multi(&tile, &xy, threads);
        assert_eq!(radec.len(), xy.len());
        for (i, &(r, d)) in radec.iter().enumerate() {
            assert!((r - ra[i]).abs() <= 1e-6);
            assert!((d - dec[i]).abs() <= 1e-6);
        }
    }
}

#[test]
fn tile_table_orders_by_sequence() {
    let hw = Arc::new(plate());
    let tiles = TileTable::new(
        Arc::clone(&hw),
        vec![1000, 1002, 1001],
        vec![150.0, 151.0, 152.0],
        vec![30.0, 30.5, 31.0],
        vec![1, 1, 3],
    )
    .unwrap();

    assert_eq!(tiles.len(), 3);
    assert_eq!(tiles.order(1000), Some(0));
    assert_eq!(tiles.order(1002), Some(1));
    assert_eq!(tiles.order(1001), Some(2));
    assert_eq!(tiles.order(999), None);
    assert_eq!(tiles.hardware().time(), hw.time());
}

#[test]
fn tile_table_rejects_duplicates_and_misalignment() {
    let hw = Arc::new(plate());
    assert!(TileTable::new(
        Arc::clone(&hw),
        vec![1, 1],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
        vec![0, 0],
    )
    .is_err());

    assert!(TileTable::new(hw, vec![1, 2], vec![0.0], vec![0.0, 1.0], vec![0, 0]).is_err());
}
