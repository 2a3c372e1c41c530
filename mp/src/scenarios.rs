//! Example scenarios run by the CLI
//!
//! Each scenario uses fixed identities so that the insert, read and delete
//! commands operate on overlapping rows. Timestamps are relative to `now`
//! (Unix seconds) so callers can pin them in tests.

use crate::domain::{MediaProgress, ProgressKey, TitleKey, data_type};
use crate::error::ProgressError;
use crate::repository::{BatchReport, ProgressRepository};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;

/// Record written by `insert one`
pub fn single_record(now: i64) -> MediaProgress {
    MediaProgress::new("user_1", data_type::AUDIO, "pod_1", "media_4", 1_111_111_111, now)
}

/// Records written by `insert conditional`, newest first
pub fn conditional_records(now: i64) -> [MediaProgress; 2] {
    [
        MediaProgress::new("user_3", data_type::VIDEO, "title_1", "media_1", 2_222_222_222, now + MINUTE),
        MediaProgress::new("user_3", data_type::VIDEO, "title_1", "media_1", 3_333_333_333, now),
    ]
}

/// Records written by `insert batch`
pub fn batch_records(now: i64) -> Vec<MediaProgress> {
    vec![
        MediaProgress::new("user_1", data_type::AUDIO, "pod_1", "media_4", 4_444_444_444, now),
        MediaProgress::new("user_1", data_type::VIDEO, "title_1", "media_1", 5_555_555_555, now - HOUR),
        MediaProgress::new("user_1", data_type::VIDEO, "title_1", "media_2", 6_666_666_666, now - 2 * HOUR),
        MediaProgress::new("user_1", data_type::VIDEO, "title_2", "media_3", 7_777_777_777, now - 3 * HOUR),
        MediaProgress::new("user_2", data_type::VIDEO, "title_4", "media_1", 8_888_888_888, now - 4 * HOUR),
    ]
}

/// Title read by `read multiple` and `read partial-key`
pub fn sample_title() -> Result<TitleKey, ProgressError> {
    TitleKey::new("user_1", data_type::VIDEO, "title_1")
}

/// Key read by `read one` and removed by `delete`
pub fn sample_key() -> Result<ProgressKey, ProgressError> {
    sample_title()?.media("media_1")
}

pub async fn insert_one(repo: &ProgressRepository, now: i64) -> Result<MediaProgress, ProgressError> {
    let progress = single_record(now);
    repo.insert(&progress).await?;
    Ok(progress)
}

/// Write the newer record, then try to overwrite it with an older one
///
/// Returns each record with whether its write took effect.
pub async fn insert_conditional(
    repo: &ProgressRepository,
    now: i64,
) -> Result<Vec<(MediaProgress, bool)>, ProgressError> {
    let mut outcomes = Vec::new();
    for progress in conditional_records(now) {
        let applied = repo.insert_conditional(&progress).await?;
        outcomes.push((progress, applied));
    }
    Ok(outcomes)
}

pub async fn insert_batch(repo: &ProgressRepository, now: i64) -> Result<BatchReport, ProgressError> {
    repo.insert_batch(&batch_records(now)).await
}

pub async fn read_one(repo: &ProgressRepository) -> Result<MediaProgress, ProgressError> {
    repo.read_one(&sample_key()?).await
}

pub async fn read_multiple(repo: &ProgressRepository) -> Result<Vec<MediaProgress>, ProgressError> {
    repo.read_multiple(&sample_title()?, &["media_1", "media_2"]).await
}

pub async fn read_partial_key(repo: &ProgressRepository) -> Result<Vec<MediaProgress>, ProgressError> {
    repo.read_by_partial_key(&sample_title()?).await
}

pub async fn delete(repo: &ProgressRepository) -> Result<ProgressKey, ProgressError> {
    let key = sample_key()?;
    repo.delete(&key).await?;
    Ok(key)
}
