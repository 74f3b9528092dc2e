// Prompt for the job-description extraction call.
// The JSON skeleton is the shape the normalizer's caller hands back verbatim,
// so edits here change the public response shape.

/// Extraction instruction. The document text is appended by `build_extraction_prompt`.
pub const JD_EXTRACTION_PROMPT: &str = r#"Extract the following information from the job description and format it as JSON:
- Title
- Company Name
- Hide Company (keep false)
- Qualification
- Job Type
- Workplace Type
- Experience (provide as an object with min and max values)
- Currency ( INR (₹))
- Salary (provide as an object with min and max values)
- Hide Salary (keep false)
- Hiring For
- Description
- Industries (provide as a list of strings)
- Skills (provide as a list of strings)
- Location (provide as a list of strings)

Provide the information in the following key-value format:
{
    "title": "",
    "company": "",
    "hideCompany": "",
    "qualification": "",
    "jobType": "",
    "workplaceType": "",
    "experience": {
        "min": "",
        "max": ""
    },
    "currency": "",
    "salary": {
        "min": "",
        "max": ""
    },
    "hideSalary": "",
    "hiringFor": "",
    "description": "",
    "industries": [""],
    "skills": [""],
    "location": [""]
}"#;

/// Appends the extracted document text to the fixed instruction.
pub fn build_extraction_prompt(jd_text: &str) -> String {
    format!("{JD_EXTRACTION_PROMPT}\n\nJob Description:\n{jd_text}")
}
