/// Instruction placed ahead of the job posting and résumé.
pub const OPTIMIZE_INSTRUCTION: &str = "Improve the following resume so it aligns better with \
    the job post. Use relevant keywords and phrasing but do not invent experience or details \
    that are not present in the original resume. Maintain the overall structure and format of \
    the original resume as much as possible, focusing on rephrasing and adding relevant keywords \
    naturally.";

/// Builds the optimization prompt. Inputs are inserted verbatim in a single
/// pass, so braces inside them are never treated as placeholders.
pub fn build_optimize_prompt(job_posting: &str, resume_text: &str) -> String {
    format!(
        "{OPTIMIZE_INSTRUCTION}\n\n\
         --- JOB POSTING ---\n\
         {job_posting}\n\n\
         --- ORIGINAL RESUME ---\n\
         {resume_text}\n\n\
         --- OPTIMIZED RESUME ---\n"
    )
}
