use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;
use super::sections::{
    Certification, ContactInfo, Education, Project, ResumeSections, Skill, WorkExperience,
};

/// A user's single profile. `id` equals the owning user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(flatten)]
    pub sections: ResumeSections,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A freshly created profile: every contact field null, every list empty.
    pub fn empty(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            contact: ContactInfo::default(),
            sections: ResumeSections::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch in place. Used by stores without SQL and by the dev fixtures.
    pub fn apply(&mut self, patch: &ProfilePatch) {
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
    }
}

pub(crate) fn set_nullable<T: Clone>(target: &mut Option<T>, value: &Option<Option<T>>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

pub(crate) fn set_list<T: Clone>(target: &mut Vec<T>, value: &Option<Vec<T>>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

/// Whitelisted partial update for a profile. Absent fields are left untouched;
/// an explicit `null` clears a contact field. Lists are replaced wholesale and
/// stored as JSONB arrays.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfilePatch {
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
}

impl ProfilePatch {
    /// Patch that wipes every contact field to null and every list to empty.
    pub fn reset() -> Self {
        Self {
            first_name: Some(None),
            last_name: Some(None),
            email: Some(None),
            phone_number: Some(None),
            location: Some(None),
            website: Some(None),
            linkedin_url: Some(None),
            github_url: Some(None),
            work_experience: Some(Vec::new()),
            education: Some(Vec::new()),
            skills: Some(Vec::new()),
            projects: Some(Vec::new()),
            certifications: Some(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Content merged into a profile by an import. Contact fields only fill gaps;
/// lists are appended.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileImport {
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(flatten)]
    pub sections: ResumeSections,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        let patch: ProfilePatch =
            serde_json::from_value(json!({ "first_name": "Ada", "website": null })).unwrap();
        assert_eq!(patch.first_name, Some(Some("Ada".to_string())));
        assert_eq!(patch.website, Some(None));
        assert_eq!(patch.last_name, None);
        assert!(patch.skills.is_none());
    }

    #[test]
    fn test_apply_leaves_unspecified_fields() {
        let mut profile = Profile::empty(Uuid::new_v4(), Utc::now());
        profile.contact.last_name = Some("Lovelace".to_string());
        let patch: ProfilePatch = serde_json::from_value(json!({ "first_name": "Ada" })).unwrap();

        profile.apply(&patch);

        assert_eq!(profile.contact.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.contact.last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn test_reset_patch_clears_everything() {
        let mut profile = Profile::empty(Uuid::new_v4(), Utc::now());
        profile.contact.email = Some("a@b.c".to_string());
        profile.sections.skills.push(Skill::default());

        profile.apply(&ProfilePatch::reset());

        assert_eq!(profile.contact, ContactInfo::default());
        assert_eq!(profile.sections, ResumeSections::default());
    }

    #[test]
    fn test_empty_patch_detected() {
        assert!(ProfilePatch::default().is_empty());
        assert!(!ProfilePatch::reset().is_empty());
    }

    #[test]
    fn test_profile_serializes_flat() {
        let profile = Profile::empty(Uuid::nil(), Utc::now());
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("first_name").is_some());
        assert_eq!(value["work_experience"], json!([]));
    }
}
