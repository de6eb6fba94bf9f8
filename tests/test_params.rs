// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use approx::assert_abs_diff_eq;
use groundtin::geometry::{Point3, Transform};
use groundtin::ground::AdaptiveThresholds;
use groundtin::{GroundDetectionError, GroundDetectionParameters};

#[test]
fn test_defaults_fill_missing_fields() {
    let p = GroundDetectionParameters::from_json_str(
        r#"{ "largest_structure_size": 25.0, "use_multithread": false }"#,
    )
    .unwrap();
    assert_eq!(p.largest_structure_size, 25.0);
    assert!(!p.use_multithread);
    assert_eq!(p.height_percentile_factor, 80.0);
    assert_eq!(p.max_iterations, None);
    assert!(p.meters_to_project_units.is_identity());
}

#[test]
fn test_json_round_trip_keeps_every_field() {
    let p = GroundDetectionParameters {
        additional_seed_points: vec![Point3::new(1.0, 2.0, 3.0)],
        meters_to_project_units: Transform::from_scale_translation(3.0, [1.0, 0.0, 0.0]),
        max_iterations: Some(12),
        ..Default::default()
    };
    let json = p.to_json_string().unwrap();
    assert_eq!(GroundDetectionParameters::from_json_str(&json).unwrap(), p);
}

#[test]
fn test_out_of_range_values_are_rejected() {
    for json in [
        r#"{ "angle_percentile_factor": 120.0 }"#,
        r#"{ "height_percentile_factor": -1.0 }"#,
        r#"{ "largest_structure_size": 0.0 }"#,
        r#"{ "angle_threshold_deg": 95.0 }"#,
        r#"{ "max_threads": 0 }"#,
        r#"{ "max_iterations": 0 }"#,
        r#"{ "height_threshold": -0.1 }"#,
        r#"{ "meters_to_project_units": { "matrix": [[0,0,0],[0,1,0],[0,0,1]], "translation": [0,0,0] } }"#,
        r#"{ "largest_structure_size": "big" }"#,
    ] {
        let err = GroundDetectionParameters::from_json_str(json).unwrap_err();
        assert!(
            matches!(err, GroundDetectionError::InvalidParameter(_)),
            "{json} gave {err:?}"
        );
    }
}

#[test]
fn test_edge_threshold_falls_back_to_density() {
    let p = GroundDetectionParameters {
        triangle_edge_threshold: 0.0,
        density: 1.5,
        ..Default::default()
    };
    assert_eq!(p.effective_edge_threshold(), 1.5);
    let q = GroundDetectionParameters::default();
    assert_eq!(q.effective_edge_threshold(), 0.5);
}

#[test]
fn test_thresholds_from_parameters() {
    let p = GroundDetectionParameters {
        angle_threshold_deg: 90.0,
        ..Default::default()
    };
    let t = AdaptiveThresholds::from_params(&p);
    assert_abs_diff_eq!(t.angle, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    assert_eq!(t.height, 0.5);
    assert_eq!(t.classification_tolerance, 0.05);
}
