use serde::{Deserialize, Serialize};

use super::Keypoint;

/// 斜めの体幹ラインとみなす傾きの下限（|slope|）
pub const OBLIQUE_SLOPE_MIN: f64 = 0.2;
/// 斜めの体幹ラインとみなす傾きの上限（|slope|）
pub const OBLIQUE_SLOPE_MAX: f64 = 2.0;
/// 斜めラインの許容誤差倍率。カメラ設置ごとに再調整が必要になりうる
pub const OBLIQUE_TOLERANCE_FACTOR: f64 = 1.5;
/// X方向の広がりがこれ未満なら鉛直ラインとして扱う
pub const VERTICAL_X_EXTENT: f64 = 0.1;

/// これより短い肢ベクトルは角度計算に使えない
const MIN_LIMB_LENGTH: f64 = 1e-9;

/// 整列判定の方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMethod {
    /// 隣接セグメントの傾きを比較
    Slope,
    /// 最小二乗直線からの平均偏差（斜めラインに寛容）
    Regression,
}

/// 頂点 `b` における角度（度）。`a == b` や `c == b` の場合は未定義なので
/// 呼び出し側で [`is_degenerate`] を確認すること
pub fn angle_between(a: &Keypoint, b: &Keypoint, c: &Keypoint) -> f64 {
    let (bax, bay) = (a.x - b.x, a.y - b.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);

    let dot = bax * bcx + bay * bcy;
    let len = (bax * bax + bay * bay).sqrt() * (bcx * bcx + bcy * bcy).sqrt();
    let cos = (dot / len).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// 頂点 `b` からどちらかの肢がほぼ長さ0か
pub fn is_degenerate(a: &Keypoint, b: &Keypoint, c: &Keypoint) -> bool {
    let ba = (a.x - b.x).hypot(a.y - b.y);
    let bc = (c.x - b.x).hypot(c.y - b.y);
    ba < MIN_LIMB_LENGTH || bc < MIN_LIMB_LENGTH
}

pub fn is_aligned(method: AlignmentMethod, points: &[Keypoint], tolerance: f64) -> bool {
    match method {
        AlignmentMethod::Slope => is_aligned_slope(points, tolerance),
        AlignmentMethod::Regression => is_aligned_regression(points, tolerance),
    }
}

/// 隣接セグメントの傾きがどの2本も `tolerance` 以内で一致するか
///
/// x方向の変化がないセグメントは鉛直扱い。鉛直同士は一致、
/// 鉛直と非鉛直は不一致とする。
pub fn is_aligned_slope(points: &[Keypoint], tolerance: f64) -> bool {
    let slopes: Vec<Option<f64>> = points
        .windows(2)
        .map(|w| {
            let dx = w[1].x - w[0].x;
            if dx.abs() < MIN_LIMB_LENGTH {
                None
            } else {
                Some((w[1].y - w[0].y) / dx)
            }
        })
        .collect();

    for (i, a) in slopes.iter().enumerate() {
        for b in &slopes[i + 1..] {
            let agree = match (a, b) {
                (Some(a), Some(b)) => (a - b).abs() <= tolerance,
                (None, None) => true,
                _ => false,
            };
            if !agree {
                return false;
            }
        }
    }
    true
}

/// 回帰直線ベースの寛容な整列判定
///
/// 偏差は直線までの垂直距離（法線方向）の平均で、y方向の残差 |y - ŷ| ではない。
pub fn is_aligned_regression(points: &[Keypoint], tolerance: f64) -> bool {
    if points.len() < 2 {
        return true;
    }
    let n = points.len() as f64;

    let (min_x, max_x) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.x), hi.max(p.x))
        });

    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;

    // 鉛直に近い点列: xの平均からの偏差で判定
    if max_x - min_x < VERTICAL_X_EXTENT {
        let deviation = points.iter().map(|p| (p.x - mean_x).abs()).sum::<f64>() / n;
        return deviation <= tolerance;
    }

    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for p in points {
        sxy += (p.x - mean_x) * (p.y - mean_y);
        sxx += (p.x - mean_x) * (p.x - mean_x);
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    // 直線までの垂直距離の平均
    let norm = (slope * slope + 1.0).sqrt();
    let deviation = points
        .iter()
        .map(|p| (slope * p.x - p.y + intercept).abs() / norm)
        .sum::<f64>()
        / n;

    let magnitude = slope.abs();
    let tolerance = if magnitude > OBLIQUE_SLOPE_MIN && magnitude < OBLIQUE_SLOPE_MAX {
        tolerance * OBLIQUE_TOLERANCE_FACTOR
    } else {
        tolerance
    };
    deviation <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: f64, y: f64) -> Keypoint {
        Keypoint::new(x, y, 0.9)
    }

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_between(&kp(1.0, 0.0), &kp(0.0, 0.0), &kp(0.0, 1.0));
        assert!(approx_eq(angle, 90.0, 1e-9));
    }

    #[test]
    fn test_straight_angle() {
        let angle = angle_between(&kp(0.0, 0.5), &kp(0.5, 0.5), &kp(1.0, 0.5));
        assert!(approx_eq(angle, 180.0, 1e-9));
    }

    #[test]
    fn test_sixty_degrees() {
        let (s, c) = 60f64.to_radians().sin_cos();
        let angle = angle_between(&kp(1.0, 0.0), &kp(0.0, 0.0), &kp(c, s));
        assert!(approx_eq(angle, 60.0, 1e-9));
    }

    #[test]
    fn test_degenerate_detection() {
        let b = kp(0.4, 0.4);
        assert!(is_degenerate(&b, &b, &kp(0.1, 0.1)));
        assert!(!is_degenerate(&kp(0.1, 0.4), &b, &kp(0.4, 0.1)));
    }

    #[test]
    fn test_slope_collinear_passes() {
        let points = [kp(0.2, 0.3), kp(0.5, 0.31), kp(0.8, 0.32)];
        assert!(is_aligned_slope(&points, 0.25));
    }

    #[test]
    fn test_slope_sagging_hip_fails() {
        // 腰が落ちている: 肩→腰は下り、腰→足首は上り
        let points = [kp(0.2, 0.3), kp(0.5, 0.5), kp(0.8, 0.32)];
        assert!(!is_aligned_slope(&points, 0.25));
    }

    #[test]
    fn test_slope_vertical_segments() {
        let vertical = [kp(0.5, 0.1), kp(0.5, 0.4), kp(0.5, 0.8)];
        assert!(is_aligned_slope(&vertical, 0.1));

        let bent = [kp(0.5, 0.1), kp(0.5, 0.4), kp(0.7, 0.8)];
        assert!(!is_aligned_slope(&bent, 0.1));
    }

    #[test]
    fn test_regression_collinear_passes() {
        let points = [kp(0.2, 0.3), kp(0.5, 0.31), kp(0.8, 0.32)];
        assert!(is_aligned_regression(&points, 0.01));
    }

    #[test]
    fn test_regression_flat_line_not_relaxed() {
        // 傾きほぼ0: 偏差 ≈ 0.0178 は 0.015 を超える
        let points = [kp(0.2, 0.3), kp(0.5, 0.34), kp(0.8, 0.3)];
        assert!(!is_aligned_regression(&points, 0.015));
    }

    #[test]
    fn test_regression_oblique_line_relaxed() {
        // 傾き約1の斜めライン: 許容誤差が1.5倍になる
        // 偏差 ≈ 0.0126
        let points = [kp(0.2, 0.2), kp(0.5, 0.54), kp(0.8, 0.8)];
        assert!(is_aligned_regression(&points, 0.01));
        assert!(!is_aligned_regression(&points, 0.008));
    }

    #[test]
    fn test_regression_near_vertical_uses_x_deviation() {
        let points = [kp(0.50, 0.1), kp(0.55, 0.5), kp(0.50, 0.9)];
        // mean x = 0.5167, 平均偏差 ≈ 0.0222
        assert!(is_aligned_regression(&points, 0.025));
        assert!(!is_aligned_regression(&points, 0.02));
    }

    #[test]
    fn test_is_aligned_dispatch() {
        let points = [kp(0.2, 0.3), kp(0.5, 0.31), kp(0.8, 0.32)];
        assert!(is_aligned(AlignmentMethod::Slope, &points, 0.25));
        assert!(is_aligned(AlignmentMethod::Regression, &points, 0.25));
    }
}
