//! Intent dispatch and the per-intent handlers.
//!
//! Dispatch is a pure routing table. Handlers catch their own errors and
//! report them inside the envelope; nothing a handler does can abort the
//! pipeline.

use anyhow::Result;
use serde_json::{json, Map, Value};

use super::intent::{CreateAlbumParameters, Intent, SearchParameters};
use super::pipeline::{CommandProcessor, Envelope};
use crate::db::ImageRecord;

const DEFAULT_ALBUM_NAME: &str = "untitled album";

impl CommandProcessor {
    pub(crate) fn dispatch(
        &self,
        user_id: i64,
        intent: Intent,
        parameters: &Map<String, Value>,
    ) -> Envelope {
        match intent {
            Intent::Search => self.handle_search(user_id, parameters),
            Intent::CreateAlbum => self.handle_create_album(user_id, parameters),
            Intent::Edit => Envelope::failed("edit not implemented"),
            Intent::Filter => Envelope::failed("filter not implemented"),
            Intent::Sort => Envelope::failed("sort not implemented"),
            Intent::Unknown => Envelope::failed("cannot understand command intent"),
        }
    }

    fn handle_search(&self, user_id: i64, parameters: &Map<String, Value>) -> Envelope {
        match self.search_images(user_id, parameters) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "search handler failed");
                Envelope::failed(e.to_string())
            }
        }
    }

    fn search_images(&self, user_id: i64, parameters: &Map<String, Value>) -> Result<Envelope> {
        let params = SearchParameters::from_map(parameters);
        let query = params.query.unwrap_or_default();

        let matches = self.index.search_by_text(user_id, &query)?;
        let candidate_ids: Vec<i64> = matches.iter().map(|m| m.image_id).collect();

        // Re-check ownership against the image store and keep lookup order,
        // dropping ids without a surviving record.
        let records = self.db.get_images_by_ids(user_id, &candidate_ids)?;
        let images: Vec<ImageRecord> = candidate_ids
            .iter()
            .filter_map(|id| records.iter().find(|r| r.id == *id).cloned())
            .collect();
        let matched_ids: Vec<i64> = images.iter().map(|r| r.id).collect();

        let mut data = Map::new();
        data.insert("matchedImages".into(), json!(matched_ids));
        data.insert("images".into(), serde_json::to_value(&images)?);

        Ok(Envelope::success(
            format!("found {} matching images", images.len()),
            data,
        ))
    }

    fn handle_create_album(&self, user_id: i64, parameters: &Map<String, Value>) -> Envelope {
        match self.create_album_from_command(user_id, parameters) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "create-album handler failed");
                Envelope::failed(e.to_string())
            }
        }
    }

    fn create_album_from_command(
        &self,
        user_id: i64,
        parameters: &Map<String, Value>,
    ) -> Result<Envelope> {
        let params = CreateAlbumParameters::from_map(parameters);
        let album_name = params
            .album_name
            .unwrap_or_else(|| DEFAULT_ALBUM_NAME.to_string());

        let matched_images: Vec<i64> = match params.query.as_deref() {
            Some(query) => self
                .index
                .search_by_text(user_id, query)?
                .iter()
                .map(|m| m.image_id)
                .collect(),
            None => Vec::new(),
        };

        let album_id = self.db.create_album(
            user_id,
            &album_name,
            params.description.as_deref().unwrap_or(""),
            &matched_images,
            &params.tags,
            true,
        )?;

        let mut data = Map::new();
        data.insert("albumId".into(), json!(album_id));
        data.insert("albumName".into(), json!(album_name));
        data.insert("matchedImages".into(), json!(matched_images));
        data.insert("imageCount".into(), json!(matched_images.len()));

        Ok(Envelope::success(
            format!(
                "created album \"{}\" with {} images",
                album_name,
                matched_images.len()
            ),
            data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::pipeline::EnvelopeStatus;
    use crate::command::testing::{processor_with, FixedClassifier, FixedIndex};
    use crate::vector::VectorMatch;
    use tempfile::tempdir;

    fn matched(value: &Map<String, Value>) -> Vec<i64> {
        value
            .get("matchedImages")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }

    #[test]
    fn search_preserves_lookup_order_and_drops_missing_ids() {
        let dir = tempdir().unwrap();
        let setup = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, Map::new()),
            FixedIndex::empty(),
        );
        let img1 = setup.db().insert_image(1, "1.jpg", "/1", "beach", &[]).unwrap();
        let _img2 = setup.db().insert_image(1, "2.jpg", "/2", "city", &[]).unwrap();
        let img3 = setup.db().insert_image(1, "3.jpg", "/3", "beach", &[]).unwrap();

        // Lookup returns img3 before img1 and an id with no record at all
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, Map::new()),
            FixedIndex::new(vec![
                VectorMatch { image_id: img3, score: 0.9 },
                VectorMatch { image_id: img1, score: 0.9 },
                VectorMatch { image_id: 9999, score: 0.9 },
            ]),
        );
        let envelope = processor.dispatch(1, Intent::Search, &Map::new());

        assert_eq!(envelope.status, EnvelopeStatus::Success);
        assert_eq!(matched(&envelope.data), vec![img3, img1]);
        assert_eq!(envelope.message, "found 2 matching images");

        let images = envelope.data.get("images").and_then(Value::as_array).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].get("id").and_then(Value::as_i64), Some(img3));
    }

    #[test]
    fn search_excludes_images_owned_by_other_users() {
        let dir = tempdir().unwrap();
        let setup = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, Map::new()),
            FixedIndex::empty(),
        );
        let mine = setup.db().insert_image(1, "a.jpg", "/a", "beach", &[]).unwrap();
        let theirs = setup.db().insert_image(2, "b.jpg", "/b", "beach", &[]).unwrap();

        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Search, Map::new()),
            FixedIndex::new(vec![
                VectorMatch { image_id: mine, score: 0.9 },
                VectorMatch { image_id: theirs, score: 0.9 },
            ]),
        );
        let envelope = processor.dispatch(1, Intent::Search, &Map::new());

        assert_eq!(matched(&envelope.data), vec![mine]);
        let images = envelope.data.get("images").and_then(Value::as_array).unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn create_album_without_query_is_empty_with_no_cover() {
        let dir = tempdir().unwrap();
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::CreateAlbum, Map::new()),
            FixedIndex::empty(),
        );

        let mut parameters = Map::new();
        parameters.insert("albumName".into(), "Empty".into());
        let envelope = processor.dispatch(1, Intent::CreateAlbum, &parameters);

        assert_eq!(envelope.status, EnvelopeStatus::Success);
        assert_eq!(envelope.data.get("imageCount"), Some(&json!(0)));

        let album_id = envelope.data.get("albumId").and_then(Value::as_i64).unwrap();
        let album = processor.db().get_album(1, album_id).unwrap().unwrap();
        assert!(album.images.is_empty());
        assert_eq!(album.cover_image_id, None);
        assert!(album.is_auto);
    }

    #[test]
    fn create_album_with_query_sets_cover_to_first_match() {
        let dir = tempdir().unwrap();
        let setup = processor_with(
            &dir,
            FixedClassifier::new(Intent::CreateAlbum, Map::new()),
            FixedIndex::empty(),
        );
        let a = setup.db().insert_image(1, "a.jpg", "/a", "beach", &[]).unwrap();
        let b = setup.db().insert_image(1, "b.jpg", "/b", "beach", &[]).unwrap();

        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::CreateAlbum, Map::new()),
            FixedIndex::new(vec![
                VectorMatch { image_id: b, score: 0.9 },
                VectorMatch { image_id: a, score: 0.9 },
            ]),
        );
        let mut parameters = Map::new();
        parameters.insert("albumName".into(), "Beach trip".into());
        parameters.insert("query".into(), "beach".into());
        let envelope = processor.dispatch(1, Intent::CreateAlbum, &parameters);

        assert_eq!(envelope.status, EnvelopeStatus::Success);
        assert_eq!(envelope.data.get("albumName"), Some(&json!("Beach trip")));
        assert_eq!(matched(&envelope.data), vec![b, a]);

        let album_id = envelope.data.get("albumId").and_then(Value::as_i64).unwrap();
        let album = processor.db().get_album(1, album_id).unwrap().unwrap();
        assert_eq!(album.cover_image_id, Some(b));
        assert_eq!(album.images, vec![b, a]);

        // A later write to the image list must not move the cover
        let c = processor.db().insert_image(1, "c.jpg", "/c", "beach", &[]).unwrap();
        processor.db().add_images_to_album(1, album_id, &[c]).unwrap();
        let album = processor.db().get_album(1, album_id).unwrap().unwrap();
        assert_eq!(album.cover_image_id, Some(b));
    }

    #[test]
    fn create_album_defaults_the_name() {
        let dir = tempdir().unwrap();
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::CreateAlbum, Map::new()),
            FixedIndex::empty(),
        );

        let envelope = processor.dispatch(1, Intent::CreateAlbum, &Map::new());
        assert_eq!(envelope.data.get("albumName"), Some(&json!("untitled album")));
    }

    #[test]
    fn unimplemented_intents_fail_regardless_of_parameters() {
        let dir = tempdir().unwrap();
        let processor = processor_with(
            &dir,
            FixedClassifier::new(Intent::Edit, Map::new()),
            FixedIndex::empty(),
        );

        let mut parameters = Map::new();
        parameters.insert("operation".into(), "crop".into());

        for (intent, message) in [
            (Intent::Edit, "edit not implemented"),
            (Intent::Filter, "filter not implemented"),
            (Intent::Sort, "sort not implemented"),
        ] {
            let envelope = processor.dispatch(1, intent, &parameters);
            assert_eq!(envelope.status, EnvelopeStatus::Failed);
            assert_eq!(envelope.message, message);
            assert!(envelope.data.is_empty());
        }
    }
}
