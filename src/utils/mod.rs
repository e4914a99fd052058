use crate::models::DayPart;
use std::collections::HashSet;
use std::hash::Hash;

pub mod metrics;
pub mod validation;

pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

pub fn day_part(hour: u32) -> DayPart {
    match hour {
        5..=11 => DayPart::Morning,
        12..=16 => DayPart::Afternoon,
        17..=20 => DayPart::Evening,
        _ => DayPart::Night,
    }
}

pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    max_retries: usize,
    initial_delay: std::time::Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    let mut delay = initial_delay;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt == max_retries {
                    return Err(e);
                }

                tracing::warn!(
                    "Operation failed (attempt {}), retrying in {:?}: {:?}",
                    attempt + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                delay *= 2; // exponential backoff
            }
        }
    }

    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(1.5), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[0.2, 0.4, 0.6]) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard() {
        let a: HashSet<Uuid> = [Uuid::new_v4(), Uuid::new_v4()].into_iter().collect();
        let b = a.clone();
        assert!((jaccard(&a, &b) - 1.0).abs() < 1e-9);

        let disjoint: HashSet<Uuid> = [Uuid::new_v4()].into_iter().collect();
        assert_eq!(jaccard(&a, &disjoint), 0.0);

        let empty: HashSet<Uuid> = HashSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }

    #[test]
    fn test_day_part() {
        assert_eq!(day_part(8), DayPart::Morning);
        assert_eq!(day_part(13), DayPart::Afternoon);
        assert_eq!(day_part(19), DayPart::Evening);
        assert_eq!(day_part(2), DayPart::Night);
        assert_eq!(day_part(23), DayPart::Night);
    }

    #[tokio::test]
    async fn test_retry_with_backoff() {
        let mut attempts = 0;
        let result: Result<u32, &str> = retry_with_backoff(
            || {
                attempts += 1;
                let outcome = if attempts < 3 { Err("not yet") } else { Ok(7) };
                async move { outcome }
            },
            3,
            std::time::Duration::from_millis(1),
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(attempts, 3);
    }
}
