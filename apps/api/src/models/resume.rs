use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::double_option;
use super::profile::{set_list, set_nullable};
use super::sections::{
    Certification, ContactInfo, Education, Project, ResumeSections, SectionConfig, SectionKind,
    Skill, WorkExperience,
};

pub type SectionConfigs = BTreeMap<SectionKind, SectionConfig>;

/// A stored resume. Base resumes have no `job_id`; tailored resumes point at
/// the job they were tailored for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub name: String,
    pub target_role: Option<String>,
    pub is_base_resume: bool,
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(flatten)]
    pub sections: ResumeSections,
    pub has_cover_letter: bool,
    pub section_order: Vec<SectionKind>,
    pub document_settings: Option<Value>,
    pub section_configs: Option<SectionConfigs>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resume {
    pub fn apply(&mut self, patch: &ResumePatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        set_nullable(&mut self.target_role, &patch.target_role);

        let c = &mut self.contact;
        set_nullable(&mut c.first_name, &patch.first_name);
        set_nullable(&mut c.last_name, &patch.last_name);
        set_nullable(&mut c.email, &patch.email);
        set_nullable(&mut c.phone_number, &patch.phone_number);
        set_nullable(&mut c.location, &patch.location);
        set_nullable(&mut c.website, &patch.website);
        set_nullable(&mut c.linkedin_url, &patch.linkedin_url);
        set_nullable(&mut c.github_url, &patch.github_url);

        let s = &mut self.sections;
        set_list(&mut s.work_experience, &patch.work_experience);
        set_list(&mut s.education, &patch.education);
        set_list(&mut s.skills, &patch.skills);
        set_list(&mut s.projects, &patch.projects);
        set_list(&mut s.certifications, &patch.certifications);

        if let Some(v) = patch.has_cover_letter {
            self.has_cover_letter = v;
        }
        set_list(&mut self.section_order, &patch.section_order);
        set_nullable(&mut self.document_settings, &patch.document_settings);
        set_nullable(&mut self.section_configs, &patch.section_configs);
    }
}

/// Insert payload for a resume; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewResume {
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub name: String,
    pub target_role: Option<String>,
    pub is_base_resume: bool,
    pub contact: ContactInfo,
    pub sections: ResumeSections,
    pub has_cover_letter: bool,
    pub section_order: Vec<SectionKind>,
    pub document_settings: Option<Value>,
    pub section_configs: Option<SectionConfigs>,
}

impl NewResume {
    pub fn into_resume(self, id: Uuid, now: DateTime<Utc>) -> Resume {
        Resume {
            id,
            user_id: self.user_id,
            job_id: self.job_id,
            name: self.name,
            target_role: self.target_role,
            is_base_resume: self.is_base_resume,
            contact: self.contact,
            sections: self.sections,
            has_cover_letter: self.has_cover_letter,
            section_order: self.section_order,
            document_settings: self.document_settings,
            section_configs: self.section_configs,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Whitelisted partial update for a resume. Ownership, kind and job linkage
/// are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResumePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub target_role: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub github_url: Option<Option<String>>,
    #[serde(default)]
    pub work_experience: Option<Vec<WorkExperience>>,
    #[serde(default)]
    pub education: Option<Vec<Education>>,
    #[serde(default)]
    pub skills: Option<Vec<Skill>>,
    #[serde(default)]
    pub projects: Option<Vec<Project>>,
    #[serde(default)]
    pub certifications: Option<Vec<Certification>>,
    #[serde(default)]
    pub has_cover_letter: Option<bool>,
    #[serde(default)]
    pub section_order: Option<Vec<SectionKind>>,
    #[serde(default, deserialize_with = "double_option")]
    pub document_settings: Option<Option<Value>>,
    #[serde(default, deserialize_with = "double_option")]
    pub section_configs: Option<Option<SectionConfigs>>,
}

impl ResumePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a new base resume is seeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportOption {
    Fresh,
    #[default]
    ImportProfile,
    ImportResume,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sections::default_section_order;
    use serde_json::json;

    fn sample_resume() -> Resume {
        NewResume {
            user_id: Uuid::new_v4(),
            job_id: None,
            name: "Backend".to_string(),
            target_role: Some("Engineer".to_string()),
            is_base_resume: true,
            contact: ContactInfo::default(),
            sections: ResumeSections::default(),
            has_cover_letter: false,
            section_order: default_section_order(),
            document_settings: Some(json!({ "font": "Inter" })),
            section_configs: None,
        }
        .into_resume(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_import_option_kebab_case() {
        let opt: ImportOption = serde_json::from_value(json!("import-resume")).unwrap();
        assert_eq!(opt, ImportOption::ImportResume);
        assert_eq!(ImportOption::default(), ImportOption::ImportProfile);
    }

    #[test]
    fn test_patch_ignores_non_whitelisted_fields() {
        let patch: ResumePatch =
            serde_json::from_value(json!({ "user_id": Uuid::new_v4(), "is_base_resume": false }))
                .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_apply_clears_document_settings_on_null() {
        let mut resume = sample_resume();
        let patch: ResumePatch =
            serde_json::from_value(json!({ "document_settings": null, "name": "Renamed" })).unwrap();

        resume.apply(&patch);

        assert!(resume.document_settings.is_none());
        assert_eq!(resume.name, "Renamed");
        assert_eq!(resume.target_role.as_deref(), Some("Engineer"));
    }

    #[test]
    fn test_section_configs_roundtrip_as_map() {
        let patch: ResumePatch = serde_json::from_value(json!({
            "section_configs": { "skills": { "visible": false } }
        }))
        .unwrap();
        let configs = patch.section_configs.unwrap().unwrap();
        assert!(!configs[&SectionKind::Skills].visible);
    }
}
