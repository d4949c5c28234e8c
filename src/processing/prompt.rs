//! Question-answering prompt.

/// Render the prompt for `question` over the retrieved `chunks`, joined by blank lines.
pub fn render_prompt<S: AsRef<str>>(chunks: &[S], question: &str) -> String {
    let context = chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are an intelligent assistant retrieving accurate information.\n\
         Answer ONLY using the given context.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         User's Question:\n\
         {question}\n\
         \n\
         Your Answer:\n"
    )
}
