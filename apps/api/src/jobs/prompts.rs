// Job description LLM prompt templates.

pub const JOB_DESCRIPTION_SYSTEM: &str = "\
You are an experienced technical recruiter who writes clear, inclusive job descriptions. \
Write in plain text with short section headings. Do not invent salary figures or company facts.";

pub const JOB_DESCRIPTION_PROMPT_TEMPLATE: &str = r#"Write a job description for the role below.

{untrusted_instruction}

TITLE: {title}
LOCATION: {location}
EXPERIENCE: {experience_min}-{experience_max} years
KEY SKILLS: {skills}

Include these sections, in order:
1. About the role (2-3 sentences)
2. Responsibilities (5-7 bullet points)
3. Requirements (bullet points covering the key skills and experience range)
4. Nice to have (2-4 bullet points)

Keep it under 400 words. Return only the description text."#;
