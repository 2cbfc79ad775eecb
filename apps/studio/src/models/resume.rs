use serde::{Deserialize, Serialize};

/// Everything the user types into the resume form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeData {
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    /// Comma-separated, as typed.
    #[serde(default)]
    pub skills: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub dates: String,
    /// Free text; usually one `- ` bullet per line.
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub school: String,
    #[serde(default)]
    pub dates: String,
}

impl ResumeData {
    /// Pre-filled example shown when the form is first opened.
    pub fn sample() -> Self {
        Self {
            full_name: "Jane Doe".to_string(),
            email: "jane.doe@example.com".to_string(),
            phone: "123-456-7890".to_string(),
            linkedin: "linkedin.com/in/janedoe".to_string(),
            github: "github.com/janedoe".to_string(),
            summary: "A passionate software engineer with 5 years of experience in building \
                scalable web applications."
                .to_string(),
            experience: vec![ExperienceEntry {
                title: "Senior Software Engineer".to_string(),
                company: "Tech Corp".to_string(),
                dates: "2020 - Present".to_string(),
                description: "- Led the development of a major feature, improving user \
                    engagement by 20%.\n- Mentored junior developers and conducted code reviews."
                    .to_string(),
            }],
            education: vec![EducationEntry {
                degree: "B.S. in Computer Science".to_string(),
                school: "State University".to_string(),
                dates: "2012 - 2016".to_string(),
            }],
            skills: "React, TypeScript, Node.js, Python, AWS, SQL".to_string(),
        }
    }

    /// Skills split on commas, blanks dropped.
    pub fn skill_list(&self) -> Vec<&str> {
        self.skills
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}
