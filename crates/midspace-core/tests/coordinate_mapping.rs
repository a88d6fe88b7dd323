use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use midspace_core::{AffineTransform, ImageGeometry, Matrix3, Point3, Vector3};
use proptest::prelude::*;

type Backend = NdArray<f32>;

fn make_rotation(angle_x: f64, angle_y: f64, angle_z: f64) -> Matrix3 {
    let (sx, cx) = angle_x.sin_cos();
    let (sy, cy) = angle_y.sin_cos();
    let (sz, cz) = angle_z.sin_cos();

    let rz = Matrix3::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);
    let ry = Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
    let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);

    rx * ry * rz
}

proptest! {
    #[test]
    fn test_coordinate_roundtrip(
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ax in -3.14f64..3.14, ay in -3.14f64..3.14, az in -3.14f64..3.14,
        px in -50.0f64..50.0, py in -50.0f64..50.0, pz in -50.0f64..50.0
    ) {
        let geom = ImageGeometry::new(
            [32, 40, 48],
            Vector3::new(sx, sy, sz),
            make_rotation(ax, ay, az),
            Point3::new(ox, oy, oz),
            None,
        ).unwrap();

        let roundtrip = geom.vox2world().compose(geom.world2vox());
        prop_assert!(roundtrip.approx_eq(&AffineTransform::identity(), 1e-6));

        let point = Point3::new(px, py, pz);
        let recovered = geom.voxel_to_world(&geom.world_to_voxel(&point));
        prop_assert!((point - recovered).amax() < 1e-6, "{:?} vs {:?}", point, recovered);
    }

    #[test]
    fn test_geometry_recovered_from_matrix(
        sx in 0.5f64..3.0, sy in 0.5f64..3.0, sz in 0.5f64..3.0,
        ax in -3.0f64..3.0, ay in -1.5f64..1.5, az in -3.0f64..3.0,
        ox in -20.0f64..20.0
    ) {
        let geom = ImageGeometry::new(
            [16, 24, 20],
            Vector3::new(sx, sy, sz),
            make_rotation(ax, ay, az),
            Point3::new(ox, -ox, 0.5 * ox),
            None,
        ).unwrap();

        let recovered = ImageGeometry::from_vox2world(geom.shape(), geom.vox2world()).unwrap();
        prop_assert!(recovered.is_equal(&geom, 1e-6));
        prop_assert!(recovered.vox2world().approx_eq(geom.vox2world(), 1e-9));
    }

    #[test]
    fn test_sqrtm_of_rigid_squares_back(
        ax in -1.0f64..1.0, ay in -0.7f64..0.7, az in -1.0f64..1.0,
        tx in -30.0f64..30.0, ty in -30.0f64..30.0, tz in -30.0f64..30.0
    ) {
        let rigid = AffineTransform::from_parts(make_rotation(ax, ay, az), Vector3::new(tx, ty, tz));
        let root = rigid.sqrtm().unwrap();
        prop_assert!(root.compose(&root).approx_eq(&rigid, 1e-4));
    }

    #[test]
    fn test_sqrtm_of_sheared_affine_squares_back(
        ax in -0.6f64..0.6, ay in -0.6f64..0.6, az in -0.6f64..0.6,
        sx in 0.8f64..1.25, sy in 0.8f64..1.25, sz in 0.8f64..1.25,
        hxy in -0.1f64..0.1, hxz in -0.1f64..0.1, hyz in -0.1f64..0.1,
        tx in -30.0f64..30.0, ty in -30.0f64..30.0, tz in -30.0f64..30.0
    ) {
        let scale = Matrix3::from_diagonal(&Vector3::new(sx, sy, sz));
        let shear = Matrix3::new(1.0, hxy, hxz, 0.0, 1.0, hyz, 0.0, 0.0, 1.0);
        let linear = make_rotation(ax, ay, az) * scale * shear;
        let affine = AffineTransform::from_parts(linear, Vector3::new(tx, ty, tz));
        prop_assume!(affine.determinant() > 0.0);

        let root = affine.sqrtm().unwrap();
        prop_assert!(root.compose(&root).approx_eq(&affine, 1e-4));
        prop_assert!((root.determinant() - affine.determinant().sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_tensor_batch_consistency(
        ox in -10.0f64..10.0,
        sx in 0.5f64..2.0,
        px in -10.0f64..10.0
    ) {
        let device = Default::default();
        let geom = ImageGeometry::new(
            [8, 8, 8],
            Vector3::new(sx, sx, sx),
            Matrix3::identity(),
            Point3::new(ox, ox, ox),
            None,
        ).unwrap();

        let point = Point3::new(px, px, px);
        let index = geom.world_to_voxel(&point);

        let points = Tensor::<Backend, 2>::from_floats([[px as f32, px as f32, px as f32]], &device);
        let indices = geom.world2vox().transform_points(points).into_data();
        let indices = indices.as_slice::<f32>().unwrap();

        prop_assert!((indices[0] - index[0] as f32).abs() < 1e-3);
        prop_assert!((indices[1] - index[1] as f32).abs() < 1e-3);
        prop_assert!((indices[2] - index[2] as f32).abs() < 1e-3);
    }
}
