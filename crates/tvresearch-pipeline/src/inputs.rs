//! Inputs carried from stage to stage.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::stage::StageKind;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Production brief the first stage starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParameters {
    pub channel_type: String,
    pub time_slot: String,
    pub audience_demographic: String,
    pub production_timeline: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_focus: Option<String>,
}

impl RequestParameters {
    /// Build the brief for a topic, or for trending topics when `topic` is `None`.
    pub fn for_topic(topic: Option<&str>) -> Self {
        Self::for_topic_at(topic, Local::now().naive_local())
    }

    /// Same as [`Self::for_topic`] with an explicit timestamp.
    pub fn for_topic_at(topic: Option<&str>, at: NaiveDateTime) -> Self {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        match topic {
            Some(topic) => Self {
                channel_type: format!("Special Report on {}", topic),
                time_slot: "Prime Time Documentary/Special Segment".to_string(),
                audience_demographic: format!("Educated general audience interested in {}", topic),
                production_timeline: "1-2 weeks for comprehensive coverage".to_string(),
                timestamp,
                research_focus: Some(topic.to_string()),
            },
            None => Self {
                channel_type: "News and Entertainment".to_string(),
                time_slot: "Prime Time".to_string(),
                audience_demographic: "General audience aged 25-54".to_string(),
                production_timeline: "24-48 hours".to_string(),
                timestamp,
                research_focus: None,
            },
        }
    }
}

/// Request parameters plus every prior stage's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatedInputs {
    pub request: RequestParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_strategy: Option<String>,
}

impl AccumulatedInputs {
    pub fn new(request: RequestParameters) -> Self {
        Self {
            request,
            trend_analysis: None,
            news_analysis: None,
            content_strategy: None,
        }
    }

    /// Add a stage's output under that stage's key.
    ///
    /// The final stage's output is not carried anywhere, so it leaves the
    /// inputs unchanged.
    pub fn with_stage_output(mut self, stage: StageKind, output: String) -> Self {
        match stage {
            StageKind::TrendResearch => self.trend_analysis = Some(output),
            StageKind::NewsAggregation => self.news_analysis = Some(output),
            StageKind::ContentStrategy => self.content_strategy = Some(output),
            StageKind::FinalReporting => {}
        }
        self
    }

    /// Output of an earlier stage, if present.
    pub fn stage_output(&self, stage: StageKind) -> Option<&str> {
        match stage {
            StageKind::TrendResearch => self.trend_analysis.as_deref(),
            StageKind::NewsAggregation => self.news_analysis.as_deref(),
            StageKind::ContentStrategy => self.content_strategy.as_deref(),
            StageKind::FinalReporting => None,
        }
    }

    /// Flatten into a single key/value map for capabilities that want one.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("channel_type".to_string(), self.request.channel_type.clone());
        map.insert("time_slot".to_string(), self.request.time_slot.clone());
        map.insert(
            "audience_demographic".to_string(),
            self.request.audience_demographic.clone(),
        );
        map.insert(
            "production_timeline".to_string(),
            self.request.production_timeline.clone(),
        );
        map.insert("timestamp".to_string(), self.request.timestamp.clone());
        if let Some(focus) = &self.request.research_focus {
            map.insert("research_focus".to_string(), focus.clone());
        }
        for stage in StageKind::ALL {
            if let (Some(key), Some(output)) = (stage.output_key(), self.stage_output(stage)) {
                map.insert(key.to_string(), output.to_string());
            }
        }
        map
    }
}
