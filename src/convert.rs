use crate::error::{AppError, Result};
use crate::target::Rating;

/// Converts a nullable library counter into the catalog's non-null 32 bit
/// form. A missing value means zero.
pub fn to_bounded_int(value: Option<i64>) -> Result<i32> {
    match value {
        None => Ok(0),
        Some(n) => i32::try_from(n).map_err(|_| AppError::OutOfRange(n)),
    }
}

/// Converts a nullable 0..=5 star rating. A missing rating means no stars.
pub fn to_star_rating(value: Option<i64>) -> Result<Rating> {
    let stars = to_bounded_int(value)?;
    Rating::from_stars(stars).ok_or(AppError::InvalidRating(stars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_zero() {
        assert_eq!(to_bounded_int(None).unwrap(), 0);
    }

    #[test]
    fn test_representable_values_pass_through() {
        for n in [0, 1, -1, 42, i32::MAX as i64, i32::MIN as i64] {
            assert_eq!(to_bounded_int(Some(n)).unwrap() as i64, n);
        }
    }

    #[test]
    fn test_out_of_range_fails() {
        let too_big = i32::MAX as i64 + 1;
        let too_small = i32::MIN as i64 - 1;

        assert!(matches!(
            to_bounded_int(Some(too_big)),
            Err(AppError::OutOfRange(n)) if n == too_big
        ));
        assert!(matches!(
            to_bounded_int(Some(too_small)),
            Err(AppError::OutOfRange(_))
        ));
        assert!(to_star_rating(Some(i64::MAX)).is_err());
    }

    #[test]
    fn test_star_rating() {
        assert_eq!(to_star_rating(None).unwrap(), Rating::NoStars);
        for stars in 0..=5 {
            assert_eq!(to_star_rating(Some(stars)).unwrap().stars() as i64, stars);
        }
        assert_eq!(to_star_rating(Some(4)).unwrap(), Rating::FourStars);
    }

    #[test]
    fn test_star_rating_outside_range() {
        assert!(matches!(
            to_star_rating(Some(6)),
            Err(AppError::InvalidRating(6))
        ));
        assert!(matches!(
            to_star_rating(Some(-1)),
            Err(AppError::InvalidRating(-1))
        ));
    }
}
