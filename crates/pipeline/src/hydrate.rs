//! Download-count hydration. Ids the counter does not know about get
//! all-zero counts.

use zoo_core::{File, Model};
use zoo_store::{DownloadCounter, StoreError};

/// Fill `downloads` on every file.
///
/// # Errors
///
/// Returns the counter's error; the files are left untouched in that case.
pub async fn hydrate_files(
    counter: &dyn DownloadCounter,
    files: &mut [File],
) -> Result<(), StoreError> {
    if files.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = files.iter().map(|f| f.id.clone()).collect();
    let counts = counter.counts_by_files(&ids).await?;
    for file in files {
        file.downloads = Some(counts.get(&file.id).copied().unwrap_or_default());
    }
    Ok(())
}

/// Fill `downloads` on every model.
///
/// # Errors
///
/// Returns the counter's error; the models are left untouched in that case.
pub async fn hydrate_models(
    counter: &dyn DownloadCounter,
    models: &mut [Model],
) -> Result<(), StoreError> {
    if models.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
    let counts = counter.counts_by_models(&ids).await?;
    for model in models {
        model.downloads = Some(counts.get(&model.id).copied().unwrap_or_default());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use zoo_core::{DownloadCounts, Metadata, Provenance};
    use zoo_store_memory::MemoryDownloadCounter;

    use super::*;

    fn file(model_id: &str) -> File {
        File::new_pending(
            "u-1",
            model_id,
            "w.bin",
            Provenance::default(),
            1,
            Metadata::new(),
        )
    }

    #[tokio::test]
    async fn missing_entries_hydrate_to_zero() {
        let counter = MemoryDownloadCounter::new();
        let mut files = vec![file("m-1"), file("m-1")];
        counter.record(&files[0].id, "m-1", Utc::now(), 4);

        hydrate_files(&counter, &mut files).await.unwrap();
        assert_eq!(files[0].downloads.unwrap().all, 4);
        assert_eq!(files[1].downloads, Some(DownloadCounts::default()));
    }

    #[tokio::test]
    async fn models_sum_their_files() {
        let counter = MemoryDownloadCounter::new();
        counter.record("f-1", "m-1", Utc::now(), 1);
        counter.record("f-2", "m-1", Utc::now(), 2);

        let mut models = vec![zoo_core::Model {
            id: "m-1".into(),
            user_id: "u-1".into(),
            slug: "mnist".into(),
            name: String::new(),
            description: String::new(),
            visibility: "public".into(),
            keep: 10,
            created_time: Utc::now(),
            downloads: None,
        }];
        hydrate_models(&counter, &mut models).await.unwrap();
        assert_eq!(models[0].downloads.unwrap().hour, 3);
    }
}
