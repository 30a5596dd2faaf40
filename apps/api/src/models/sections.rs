use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The five content sections shared by profiles and resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    WorkExperience,
    Education,
    Skills,
    Projects,
    Certifications,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::WorkExperience,
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Projects,
        SectionKind::Certifications,
    ];
}

/// Canonical section order for new resumes.
pub fn default_section_order() -> Vec<SectionKind> {
    SectionKind::ALL.to_vec()
}

/// True when `order` names every section exactly once.
pub fn is_section_permutation(order: &[SectionKind]) -> bool {
    if order.len() != SectionKind::ALL.len() {
        return false;
    }
    SectionKind::ALL.iter().all(|s| order.contains(s))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// GPAs arrive both as numbers (`3.8`) and free text (`"3.8/4.0"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gpa {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<Gpa>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_acquired: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

/// Contact block carried by both profiles and resumes. Each field is independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
}

/// The five ordered content lists. Missing lists deserialize as empty, never null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeSections {
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

impl ResumeSections {
    pub fn is_section_empty(&self, kind: SectionKind) -> bool {
        match kind {
            SectionKind::WorkExperience => self.work_experience.is_empty(),
            SectionKind::Education => self.education.is_empty(),
            SectionKind::Skills => self.skills.is_empty(),
            SectionKind::Projects => self.projects.is_empty(),
            SectionKind::Certifications => self.certifications.is_empty(),
        }
    }
}

/// Per-section layout config. Only `visible` is interpreted server-side;
/// everything else the editor stores is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub visible: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SectionConfig {
    pub fn visible(visible: bool) -> Self {
        Self {
            visible,
            extra: Map::new(),
        }
    }
}

/// Externally-parsed or AI-tailored resume content handed to the resume service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeContent {
    #[serde(default)]
    pub target_role: Option<String>,
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(flatten)]
    pub sections: ResumeSections,
}
