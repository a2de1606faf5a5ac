use crate::error::ChatError;

/// Maximum length of one user message, in characters
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Placeholder shipped in sample configuration files
const PLACEHOLDER_API_KEY: &str = "YOUR_OPENAI_API_KEY_HERE";

/// Validate a chat message before it is sent
pub fn validate_message(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::InvalidInput("Message cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::InvalidInput(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

/// Validate the API key format before any request is made
pub fn validate_api_key(key: &str) -> Result<(), ChatError> {
    let key = key.trim();
    if key.is_empty() || key == PLACEHOLDER_API_KEY || !key.starts_with("sk-") {
        return Err(ChatError::InvalidApiKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_message_valid() {
        assert!(validate_message("Tell me about my garden").is_ok());
        assert!(validate_message("  hi  ").is_ok());
    }

    #[test]
    fn test_validate_message_empty() {
        let result = validate_message(" \n\t ");
        assert!(result.is_err());
        if let Err(ChatError::InvalidInput(msg)) = result {
            assert!(msg.contains("empty"));
        }
    }

    #[test]
    fn test_validate_message_too_long() {
        let long_text = "a".repeat(4001);
        let result = validate_message(&long_text);
        assert!(result.is_err());
        if let Err(ChatError::InvalidInput(msg)) = result {
            assert!(msg.contains("too long"));
        }

        // the limit counts characters, not bytes
        assert!(validate_message(&"é".repeat(4000)).is_ok());
    }

    #[test]
    fn test_validate_api_key() {
        assert!(validate_api_key("sk-test-1234").is_ok());
        assert!(matches!(validate_api_key(""), Err(ChatError::InvalidApiKey)));
        assert!(matches!(
            validate_api_key("YOUR_OPENAI_API_KEY_HERE"),
            Err(ChatError::InvalidApiKey)
        ));
        assert!(matches!(validate_api_key("pk-1234"), Err(ChatError::InvalidApiKey)));
    }
}
