/// Ordered keyword table; the first keyword contained in the lower-cased message wins.
pub const CANNED_RESPONSES: &[(&str, &str)] = &[
    (
        "hello",
        "გამარჯობა! I'm IGAL, your AI assistant for Georgian tax and financial law. How can I help you today?",
    ),
    (
        "რა არის",
        "This is a mock response. In production, I would search through 74 Georgian legal documents and provide accurate information about taxes and financial law.",
    ),
    (
        "test",
        "✅ Mock backend is working! The widget successfully connected and sent your message.",
    ),
];

pub fn default_response(message: &str) -> String {
    format!(
        "Mock response to: \"{message}\"\n\n✅ Widget is working!\n📡 Backend connection successful\n🤖 In production, this would be a GPT-4o response enhanced with RAG from 74 legal documents."
    )
}

pub fn canned_response(message: &str) -> String {
    let lowered = message.to_lowercase();
    CANNED_RESPONSES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| default_response(message))
}
