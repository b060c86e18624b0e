use rand::Rng;

pub fn clamp_max<T: PartialOrd>(value: T, max: T) -> T {
    if value > max {
        max
    } else {
        value
    }
}

/// `percent` percent of `value`, rounded down.
pub fn percent_of(value: u32, percent: u32) -> u32 {
    value * percent / 100
}

/// Tolerance absorbing `f32` noise such as `100.0 * 0.65 == 64.99998`.
const FLOOR_EPSILON: f32 = 1e-3;

/// Rounds down to a non-negative integer.
pub fn floor_to_u32(value: f32) -> u32 {
    let floored = (value + FLOOR_EPSILON).floor();
    if floored <= 0.0 {
        0
    } else {
        floored as u32
    }
}

/// Scales `value` by `factor`, rounding down and flooring at zero.
pub fn floor_scaled(value: u32, factor: f32) -> u32 {
    floor_to_u32(value as f32 * factor)
}

/// Rolls against a hit probability.
///
/// Certain outcomes never touch the generator.
pub fn roll_hit<R: Rng>(rng: &mut R, probability: f32) -> bool {
    if probability >= 1.0 {
        true
    } else if probability <= 0.0 {
        false
    } else {
        rng.gen::<f32>() < probability
    }
}

/// Pushes `value` unless it is already present.
pub fn push_unique<T: PartialEq>(vec: &mut Vec<T>, value: T) -> bool {
    if vec.contains(&value) {
        false
    } else {
        vec.push(value);
        true
    }
}
