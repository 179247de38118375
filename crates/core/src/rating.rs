use crate::model::Rating;

/// Mean score of `ratings`, or 0 when there are none
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(r.score)).sum();
    f64::from(sum) / ratings.len() as f64
}

/// Drop any rating by `incoming.rater_id`, then append `incoming`.
///
/// At most one rating per rater survives; other raters keep their
/// relative order.
pub fn upsert_rating(existing: &[Rating], incoming: Rating) -> Vec<Rating> {
    let mut ratings: Vec<Rating> = existing
        .iter()
        .filter(|r| r.rater_id != incoming.rater_id)
        .cloned()
        .collect();
    ratings.push(incoming);
    ratings
}
