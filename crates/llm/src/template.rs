//! Deterministic template drafter
//!
//! Stands in for the HTTP drafter in tests and offline runs. Assembles a
//! reply from the structured fields alone, so behaviour is reproducible.

use async_trait::async_trait;

use leadflow_core::traits::{CollaboratorError, DraftContext, DraftedResponse, ResponseDrafter};

#[derive(Debug, Clone, Default)]
pub struct TemplateDrafter;

#[async_trait]
impl ResponseDrafter for TemplateDrafter {
    async fn draft(&self, ctx: &DraftContext) -> Result<DraftedResponse, CollaboratorError> {
        let text = match &ctx.stall_breaker {
            Some(breaker) => breaker.clone(),
            None => ctx.tone.guidance().to_string(),
        };
        Ok(DraftedResponse {
            text,
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}
