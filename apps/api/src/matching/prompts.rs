// Matching LLM prompt templates.

pub const MATCH_ANALYSIS_SYSTEM: &str = "\
You are an expert technical recruiter who scores resumes against job postings. \
Be objective and evidence-based: only credit skills and experience the resume shows. \
You MUST respond with valid JSON only: no markdown fences, no explanations.";

pub const MATCH_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Evaluate how well the candidate resume matches the job.

{untrusted_instruction}

JOB TITLE: {job_title}
LOCATION: {job_location}
REQUIRED SKILLS: {required_skills}
REQUIRED EXPERIENCE: {experience_min}-{experience_max} years

JOB DESCRIPTION:
{job_description}

CANDIDATE RESUME:
{resume_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "matchScore": number 0-100,
  "skillsMatch": {
    "matched": ["required skills the resume demonstrates"],
    "missing": ["required skills the resume does not show"],
    "additional": ["relevant skills beyond the requirements"]
  },
  "experienceMatch": {
    "candidateYears": number | null,
    "meetsRequirement": boolean,
    "analysis": "one or two sentences"
  },
  "strengths": ["3 to 5 items"],
  "concerns": ["3 to 5 items"],
  "recommendation": "Strong Match" | "Good Match" | "Moderate Match" | "Weak Match" | "Poor Match",
  "summary": "two or three sentences"
}

RULES:
1. matchScore weighs required skills most, then experience, then everything else
2. Never invent experience that is not in the resume
3. Return ONLY the JSON object, nothing else, no code fences."#;
