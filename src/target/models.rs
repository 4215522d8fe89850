use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistHandle(pub u64);

/// Star rating as the target catalog stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    #[default]
    NoStars,
    OneStar,
    TwoStars,
    ThreeStars,
    FourStars,
    FiveStars,
}

impl Rating {
    pub fn from_stars(stars: i32) -> Option<Self> {
        match stars {
            0 => Some(Rating::NoStars),
            1 => Some(Rating::OneStar),
            2 => Some(Rating::TwoStars),
            3 => Some(Rating::ThreeStars),
            4 => Some(Rating::FourStars),
            5 => Some(Rating::FiveStars),
            _ => None,
        }
    }

    pub fn stars(self) -> i32 {
        match self {
            Rating::NoStars => 0,
            Rating::OneStar => 1,
            Rating::TwoStars => 2,
            Rating::ThreeStars => 3,
            Rating::FourStars => 4,
            Rating::FiveStars => 5,
        }
    }

    /// The catalog keeps ratings on a 0..=100 scale, 20 per star.
    pub fn percent(self) -> i32 {
        self.stars() * 20
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stars() {
            1 => write!(f, "1 star"),
            n => write!(f, "{} stars", n),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetTrack {
    pub id: TrackHandle,
    pub location: String,
    pub name: String,
    pub artist: String,
    pub date_added: DateTime<Utc>,
    pub played_count: i32,
    pub played_date: Option<DateTime<Utc>>,
    pub rating: Rating,
    pub skipped_count: i32,
    pub skipped_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPlaylist {
    pub id: PlaylistHandle,
    pub name: String,
    pub tracks: Vec<TrackHandle>,
}

#[cfg(test)]
impl TargetTrack {
    pub fn mock(id: u64, location: &str) -> Self {
        Self {
            id: TrackHandle(id),
            location: location.to_string(),
            name: "Mock Track".to_string(),
            artist: "Mock Artist".to_string(),
            date_added: DateTime::<Utc>::UNIX_EPOCH,
            played_count: 0,
            played_date: None,
            rating: Rating::NoStars,
            skipped_count: 0,
            skipped_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_stars_and_percent() {
        for stars in 0..=5 {
            let rating = Rating::from_stars(stars).unwrap();
            assert_eq!(rating.stars(), stars);
            assert_eq!(rating.percent(), stars * 20);
        }
        assert_eq!(Rating::from_stars(6), None);
        assert_eq!(Rating::from_stars(-1), None);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::OneStar.to_string(), "1 star");
        assert_eq!(Rating::FourStars.to_string(), "4 stars");
        assert_eq!(Rating::default().to_string(), "0 stars");
    }
}
