//! Weather handler: a thin front over the real-time engine with the category pinned.

use herald_core::{
    CapabilityHandler, HandlerContext, HandlerResult, HeraldError, HeraldResult, RealTimeCategory,
    RealTimeRequest, Task, TaskCategory,
};
use std::sync::Arc;

use crate::realtime::{shortcuts, RealTimeEngine};

const HANDLER_NAME: &str = "weather";

pub struct WeatherHandler {
    engine: Arc<RealTimeEngine>,
}

impl WeatherHandler {
    pub fn new(engine: Arc<RealTimeEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for WeatherHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::Weather
    }

    async fn handle(&self, task: &Task, _ctx: &HandlerContext) -> HeraldResult<HandlerResult> {
        let location = task
            .detail("query")
            .or_else(|| task.detail("location"))
            .map(str::to_string)
            .or_else(|| {
                shortcuts::parse(&task.utterance)
                    .filter(|r| r.category == RealTimeCategory::Weather)
                    .and_then(|r| r.subject().map(str::to_string))
            })
            .ok_or_else(|| HeraldError::InvalidInput("Which city should I check the weather for?".into()))?;

        tracing::debug!(target: "herald::skills::weather", location = %location, "weather lookup");
        let request = RealTimeRequest::new(RealTimeCategory::Weather, location.clone());
        let query = format!("weather in {location}");
        Ok(self.engine.answer(&query, Some(request)).await)
    }
}
