use std::collections::HashSet;
use std::time::Duration;

use unicode_normalization::UnicodeNormalization;
use xxhash_rust::xxh3::xxh3_64;

use crate::capabilities::SentenceMatcher;
use crate::config::AttributionConfig;
use crate::errors::PipelineError;
use crate::models::{Attribution, RawSentenceMatch, Report, SourceMessage};
use crate::sentences::split_sentences;

/// Maps every sentence of a finished report back to the source message that
/// justifies it. The matcher's output is treated as untrusted input: this
/// function guarantees that what it returns covers the report completely —
/// exactly one attribution per sentence, verbatim sentence text, known
/// source ids, confidence clamped to the configured range — or it fails.
pub async fn attribute(
    report: &Report,
    sources: &[SourceMessage],
    matcher: &dyn SentenceMatcher,
    cfg: &AttributionConfig,
    timeout: Duration,
) -> Result<Vec<Attribution>, PipelineError> {
    let sentences = split_sentences(&report.body);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let raw = tokio::time::timeout(timeout, matcher.match_sentences(&sentences, sources))
        .await
        .map_err(|_| PipelineError::StageTimeout {
            stage: "attribution",
            channel_id: report.channel_id.clone(),
        })?
        .map_err(|e| PipelineError::CapabilityFailure {
            stage: "attribution",
            channel_id: report.channel_id.clone(),
            detail: e.to_string(),
        })?;

    validate_matches(report, &sentences, sources, &raw, cfg)
}

/// JSON payload for matcher implementations that talk to an LLM endpoint:
/// the sentence list plus full source-message id strings. Ids go over the
/// wire verbatim — positions or truncated ids would silently misattribute.
pub fn matching_request_json(
    sentences: &[String],
    sources: &[SourceMessage],
) -> serde_json::Value {
    serde_json::json!({
        "sentences": sentences,
        "source_messages": sources
            .iter()
            .map(|m| serde_json::json!({ "id": m.id, "text": m.text }))
            .collect::<Vec<_>>(),
    })
}

/// NFC-normalized, whitespace-trimmed comparison key. The attribution still
/// stores the original body substring, so equality here never launders a
/// paraphrase into the output.
fn comparison_key(s: &str) -> String {
    s.trim().nfc().collect()
}

fn validate_matches(
    report: &Report,
    sentences: &[String],
    sources: &[SourceMessage],
    raw: &[RawSentenceMatch],
    cfg: &AttributionConfig,
) -> Result<Vec<Attribution>, PipelineError> {
    if raw.len() != sentences.len() {
        return Err(PipelineError::IncompleteCoverage {
            report_id: report.id.clone(),
            detail: format!(
                "expected {} attributions, matcher returned {}",
                sentences.len(),
                raw.len()
            ),
        });
    }

    let known_ids: HashSet<&str> = sources.iter().map(|m| m.id.as_str()).collect();
    let mut used = vec![false; raw.len()];
    let mut attributions = Vec::with_capacity(sentences.len());

    for (idx, sentence) in sentences.iter().enumerate() {
        let key = comparison_key(sentence);
        let found = raw
            .iter()
            .enumerate()
            .find(|(ri, m)| !used[*ri] && comparison_key(&m.sentence_text) == key);

        let Some((ri, m)) = found else {
            return Err(PipelineError::IncompleteCoverage {
                report_id: report.id.clone(),
                detail: format!("no verbatim match returned for sentence: {}", sentence),
            });
        };
        used[ri] = true;

        if !known_ids.contains(m.source_message_id.as_str()) {
            return Err(PipelineError::IncompleteCoverage {
                report_id: report.id.clone(),
                detail: format!(
                    "attribution references unknown source message id '{}'",
                    m.source_message_id
                ),
            });
        }

        if m.confidence < cfg.sanity_min || m.confidence > cfg.sanity_max || !m.confidence.is_finite()
        {
            return Err(PipelineError::InvalidConfidence {
                report_id: report.id.clone(),
                sentence: sentence.clone(),
                confidence: m.confidence,
            });
        }
        let confidence = m
            .confidence
            .clamp(cfg.confidence_floor, cfg.confidence_ceiling);

        let seed = format!("{}|{}|{}", report.id, idx, m.source_message_id);
        attributions.push(Attribution {
            id: format!("{:016x}", xxh3_64(seed.as_bytes())),
            sentence: sentence.clone(),
            source_message_id: m.source_message_id.clone(),
            confidence,
        });
    }

    Ok(attributions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct CannedMatcher {
        reply: Vec<RawSentenceMatch>,
    }

    #[async_trait]
    impl SentenceMatcher for CannedMatcher {
        async fn match_sentences(
            &self,
            _sentences: &[String],
            _sources: &[SourceMessage],
        ) -> Result<Vec<RawSentenceMatch>> {
            Ok(self.reply.clone())
        }
    }

    struct StalledMatcher;

    #[async_trait]
    impl SentenceMatcher for StalledMatcher {
        async fn match_sentences(
            &self,
            _sentences: &[String],
            _sources: &[SourceMessage],
        ) -> Result<Vec<RawSentenceMatch>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn report(body: &str) -> Report {
        Report {
            id: "rpt-1".into(),
            headline: "Troop movements and talks".into(),
            city: "kyiv".into(),
            body: body.into(),
            generated_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            channel_id: "alpha".into(),
            message_count: 12,
            timeframe: "last hour".into(),
        }
    }

    fn source(id: &str) -> SourceMessage {
        SourceMessage {
            id: id.into(),
            text: format!("message {}", id),
            sent_at: Utc.with_ymd_and_hms(2026, 3, 1, 11, 30, 0).unwrap(),
            channel_id: "alpha".into(),
        }
    }

    fn m(sentence: &str, source_id: &str, confidence: f32) -> RawSentenceMatch {
        RawSentenceMatch {
            sentence_text: sentence.into(),
            source_message_id: source_id.into(),
            confidence,
        }
    }

    const BODY: &str = "Troops moved south. Talks resumed in the capital.";

    #[tokio::test]
    async fn two_sentences_yield_two_attributions_to_distinct_messages() {
        let rpt = report(BODY);
        // ids are opaque numeric-string tokens well past u64 range
        let sources = [source("184467440737095516150001"), source("184467440737095516150002")];
        let matcher = CannedMatcher {
            reply: vec![
                m("Troops moved south.", "184467440737095516150001", 0.9),
                m(
                    "Talks resumed in the capital.",
                    "184467440737095516150002",
                    0.7,
                ),
            ],
        };
        let got = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].sentence, "Troops moved south.");
        assert_eq!(got[1].sentence, "Talks resumed in the capital.");
        assert_ne!(got[0].source_message_id, got[1].source_message_id);
        assert_ne!(got[0].id, got[1].id);
    }

    #[tokio::test]
    async fn attributions_reconstruct_the_body_in_order() {
        let rpt = report(BODY);
        let sources = [source("1"), source("2")];
        let matcher = CannedMatcher {
            reply: vec![
                // matcher may answer out of order; output follows report order
                m("Talks resumed in the capital.", "2", 0.8),
                m("Troops moved south.", "1", 0.8),
            ],
        };
        let got = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let squashed = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        let joined = got.iter().map(|a| a.sentence.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(squashed(&joined), squashed(BODY));
    }

    #[tokio::test]
    async fn missing_sentence_is_rejected() {
        let rpt = report(BODY);
        let sources = [source("1")];
        let matcher = CannedMatcher {
            reply: vec![m("Troops moved south.", "1", 0.9)],
        };
        let err = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::IncompleteCoverage { .. }));
    }

    #[tokio::test]
    async fn duplicated_sentence_is_rejected() {
        let rpt = report(BODY);
        let sources = [source("1"), source("2")];
        let matcher = CannedMatcher {
            reply: vec![
                m("Troops moved south.", "1", 0.9),
                m("Troops moved south.", "2", 0.9),
            ],
        };
        let err = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::IncompleteCoverage { .. }));
    }

    #[tokio::test]
    async fn truncated_sentence_text_is_rejected() {
        let rpt = report(BODY);
        let sources = [source("1"), source("2")];
        let matcher = CannedMatcher {
            reply: vec![
                m("Troops moved", "1", 0.9), // silently truncated by the model
                m("Talks resumed in the capital.", "2", 0.9),
            ],
        };
        let err = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::IncompleteCoverage { .. }));
    }

    #[tokio::test]
    async fn unknown_source_id_is_rejected() {
        let rpt = report(BODY);
        let sources = [source("1"), source("2")];
        let matcher = CannedMatcher {
            reply: vec![
                m("Troops moved south.", "1", 0.9),
                m("Talks resumed in the capital.", "99", 0.9),
            ],
        };
        let err = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::IncompleteCoverage { .. }));
    }

    #[tokio::test]
    async fn confidence_outside_sanity_range_is_rejected() {
        let rpt = report("Troops moved south.");
        let sources = [source("1")];
        let matcher = CannedMatcher {
            reply: vec![m("Troops moved south.", "1", 7.3)],
        };
        let err = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfidence { .. }));
    }

    #[tokio::test]
    async fn confidence_inside_sanity_range_is_clamped() {
        let rpt = report("Troops moved south.");
        let sources = [source("1")];
        let matcher = CannedMatcher {
            reply: vec![m("Troops moved south.", "1", 0.2)], // sane but below floor
        };
        let got = attribute(
            &rpt,
            &sources,
            &matcher,
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(got[0].confidence, 0.5);
    }

    #[tokio::test]
    async fn stalled_matcher_times_out() {
        let rpt = report(BODY);
        let sources = [source("1"), source("2")];
        let err = attribute(
            &rpt,
            &sources,
            &StalledMatcher,
            &AttributionConfig::default(),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageTimeout {
                stage: "attribution",
                ..
            }
        ));
    }

    #[test]
    fn matching_request_carries_full_id_strings() {
        let sentences = vec!["Troops moved south.".to_string()];
        let sources = [source("184467440737095516150001")];
        let payload = matching_request_json(&sentences, &sources);
        assert_eq!(
            payload["source_messages"][0]["id"],
            "184467440737095516150001"
        );
        assert_eq!(payload["sentences"][0], "Troops moved south.");
    }

    #[tokio::test]
    async fn empty_body_yields_no_attributions() {
        let rpt = report("");
        let got = attribute(
            &rpt,
            &[],
            &CannedMatcher { reply: vec![] },
            &AttributionConfig::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(got.is_empty());
    }
}
