//! # Retrieval Prompt

/// Joins retrieved chunk contents, in ranked order, into one context block.
pub fn build_context<'a>(contents: impl IntoIterator<Item = &'a str>) -> String {
    contents.into_iter().collect::<Vec<_>>().join("\n\n")
}

/// Builds the single prompt sent to the completion API.
pub fn build_rag_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion:\n{question}\nAnswer:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_prompt_layout() {
        let context = build_context(["first chunk", "second chunk"]);
        assert_eq!(context, "first chunk\n\nsecond chunk");
        assert_eq!(
            build_rag_prompt(&context, "Where was float 42?"),
            "Context:\nfirst chunk\n\nsecond chunk\n\nQuestion:\nWhere was float 42?\nAnswer:"
        );
    }
}
