use serde::{Deserialize, Serialize};

/// The four structured fields extracted from a model response. Only ever
/// produced whole: a response missing any field is a parse failure, never a
/// partially filled digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub product: String,
    pub product_author: String,
    pub core_summary: String,
    pub detailed_summary: String,
}

/// Provider-reported token counts for one model call. Summing records gives
/// the combined cost of a digestion call plus its repair calls, or of a
/// whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub total_tokens: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            total_tokens: self.total_tokens + other.total_tokens,
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: TokenUsage) {
        *self = *self + other;
    }
}
