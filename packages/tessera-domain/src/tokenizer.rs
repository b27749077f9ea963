pub trait Tokenizer
where
	Self: Send + Sync,
{
	fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Lowercases the input and keeps every run of alphanumeric characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlphanumericTokenizer;
impl Tokenizer for AlphanumericTokenizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		let lowered = text.to_lowercase();
		let mut tokens = Vec::new();
		let mut start = None;

		for (idx, ch) in lowered.char_indices() {
			if ch.is_alphanumeric() {
				if start.is_none() {
					start = Some(idx);
				}
			} else if let Some(begin) = start.take() {
				tokens.push(lowered[begin..idx].to_string());
			}
		}

		if let Some(begin) = start {
			tokens.push(lowered[begin..].to_string());
		}

		tokens
	}
}
