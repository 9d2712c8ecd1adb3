//! Native binary model format: header + postcard payload.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use super::header::{FormatFlags, FormatHeader, HEADER_SIZE, MAGIC};
use super::schema::{Payload, PayloadV1};
use crate::error::ArtifactError;
use crate::features::N_FEATURES;
use crate::model::RetentionModel;
use crate::report::EvaluationReport;

// ============================================================================
// Codec
// ============================================================================

/// Serialize a model to bytes.
pub fn encode_model(model: &RetentionModel) -> Result<Vec<u8>, ArtifactError> {
    let payload = postcard::to_allocvec(&Payload::V1(PayloadV1::from(model)))?;

    let mut flags = FormatFlags::empty();
    if model.meta().training_cutoff.is_some() {
        flags.set(FormatFlags::HAS_TRAINING_CUTOFF);
    }
    let payload_size = u32::try_from(payload.len()).map_err(|_| {
        ArtifactError::Corrupt(format!("payload of {} bytes is too large", payload.len()))
    })?;
    let header = FormatHeader {
        payload_size,
        checksum: crc32fast::hash(&payload),
        ..FormatHeader::new(N_FEATURES as u32, flags)
    };

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize and validate a model.
pub fn decode_model(bytes: &[u8]) -> Result<RetentionModel, ArtifactError> {
    if bytes.len() >= MAGIC.len() && &bytes[..MAGIC.len()] != MAGIC {
        return Err(ArtifactError::NotAModel);
    }
    let header_bytes: &[u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or(ArtifactError::Truncated {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        })?;
    let header = FormatHeader::from_bytes(header_bytes)?;

    let expected = HEADER_SIZE + header.payload_size as usize;
    if bytes.len() < expected {
        return Err(ArtifactError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(ArtifactError::Corrupt(format!("{} trailing bytes", bytes.len() - expected)));
    }
    if header.num_features as usize != N_FEATURES {
        return Err(ArtifactError::Corrupt(format!(
            "model has {} features, expected {N_FEATURES}",
            header.num_features
        )));
    }

    let payload = &bytes[HEADER_SIZE..];
    let actual = crc32fast::hash(payload);
    if actual != header.checksum {
        return Err(ArtifactError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    let model = match postcard::from_bytes::<Payload>(payload)? {
        Payload::V1(v1) => RetentionModel::try_from(v1)?,
    };
    let flagged = header.flags.contains(FormatFlags::HAS_TRAINING_CUTOFF);
    if flagged != model.meta().training_cutoff.is_some() {
        return Err(ArtifactError::Corrupt("header cutoff flag disagrees with the payload".into()));
    }
    Ok(model)
}

// ============================================================================
// Files
// ============================================================================

/// Write `bytes` to `path` atomically.
///
/// The data goes to a temporary file in the destination directory, is synced,
/// then renamed over `path`. Readers see either the old file or the new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ArtifactError::io(dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| ArtifactError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ArtifactError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ArtifactError::io(path, e.error))?;
    Ok(())
}

/// Save a model to `path`, replacing any existing file atomically.
pub fn save_model(model: &RetentionModel, path: &Path) -> Result<(), ArtifactError> {
    let bytes = encode_model(model)?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "model saved");
    Ok(())
}

/// Load a model saved by [`save_model`].
pub fn load_model(path: &Path) -> Result<RetentionModel, ArtifactError> {
    let bytes = fs::read(path).map_err(|e| ArtifactError::io(path, e))?;
    let model = decode_model(&bytes)?;
    debug!(path = %path.display(), trees = model.forest().n_trees(), "model loaded");
    Ok(model)
}

/// Write an evaluation report as pretty JSON, atomically.
pub fn save_report_json(report: &EvaluationReport, path: &Path) -> Result<(), ArtifactError> {
    let json = serde_json::to_vec_pretty(report)?;
    write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Preprocessor, SafeFeatures};
    use crate::model::ModelMeta;
    use crate::repr::{Forest, MutableTree};

    fn model() -> RetentionModel {
        let rows: Vec<SafeFeatures> = ["Art", "QA"]
            .iter()
            .enumerate()
            .map(|(i, d)| SafeFeatures {
                tenure_months: i as f64 * 10.0,
                salary_vs_market: 1.0,
                days_since_promotion: 10.0,
                manager_tenure_months: 20.0,
                team_size: 4.0,
                is_neurodivergent: i == 0,
                department: d.to_string(),
                level: "Lead".into(),
            })
            .collect();
        let mut t = MutableTree::with_root(2.0);
        let (l, r) = t.split(0, 1, 0.5, 3.0, 1.0, 1.0);
        t.set_leaf_value(l, -0.3);
        t.set_leaf_value(r, 0.4);
        let mut forest = Forest::new(-0.2);
        forest.push_tree(t.freeze());
        RetentionModel::new(Preprocessor::fit(&rows).unwrap(), forest, ModelMeta::default())
    }

    #[test]
    fn bytes_round_trip() {
        let m = model();
        let bytes = encode_model(&m).unwrap();
        assert_eq!(&bytes[..4], b"RRSK");
        assert_eq!(decode_model(&bytes).unwrap(), m);
    }

    #[test]
    fn detects_truncation_and_foreign_bytes() {
        let bytes = encode_model(&model()).unwrap();
        assert!(matches!(decode_model(&bytes[..10]), Err(ArtifactError::Truncated { .. })));
        assert!(matches!(
            decode_model(&bytes[..bytes.len() - 1]),
            Err(ArtifactError::Truncated { .. })
        ));
        assert!(matches!(decode_model(b"{\"json\": true}"), Err(ArtifactError::NotAModel)));
    }

    #[test]
    fn header_flags_follow_the_training_cutoff() {
        let bytes = encode_model(&model()).unwrap();
        assert_eq!(bytes[6] & FormatFlags::HAS_TRAINING_CUTOFF as u8, 0);

        let base = model();
        let meta = ModelMeta {
            training_cutoff: chrono::NaiveDate::from_ymd_opt(2023, 6, 30),
            ..ModelMeta::default()
        };
        let dated = RetentionModel::new(base.preprocessor().clone(), base.forest().clone(), meta);
        let bytes = encode_model(&dated).unwrap();
        assert_ne!(bytes[6] & FormatFlags::HAS_TRAINING_CUTOFF as u8, 0);
        assert_eq!(decode_model(&bytes).unwrap(), dated);
    }

    #[test]
    fn rejects_a_cutoff_flag_without_a_cutoff() {
        let mut bytes = encode_model(&model()).unwrap();
        bytes[6] |= FormatFlags::HAS_TRAINING_CUTOFF as u8;
        assert!(matches!(decode_model(&bytes), Err(ArtifactError::Corrupt(_))));
    }

    #[test]
    fn detects_payload_corruption() {
        let mut bytes = encode_model(&model()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode_model(&bytes), Err(ArtifactError::ChecksumMismatch { .. })));
    }
}
