//! Fixture graph served while the development bypass is on: one profile, one
//! base resume, no tailored resumes and no jobs.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::job::{Job, NewJob};
use crate::models::profile::Profile;
use crate::models::resume::{NewResume, Resume, ResumePatch};
use crate::models::sections::{
    default_section_order, Certification, ContactInfo, Education, Gpa, Project, ResumeSections,
    Skill, WorkExperience,
};

pub const DEV_USER_ID: Uuid = Uuid::from_u128(0x00000000_0000_4000_8000_0000_0de7_0123);
pub const DEV_BASE_RESUME_ID: Uuid = Uuid::from_u128(0x00000000_0000_4000_8000_0000_0000_0b01);
pub const DEV_EMAIL: &str = "john.dev@example.com";

/// 2024-01-01T00:00:00Z
fn fixture_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn contact() -> ContactInfo {
    ContactInfo {
        first_name: Some("John".into()),
        last_name: Some("Developer".into()),
        email: Some(DEV_EMAIL.into()),
        phone_number: Some("+1 (555) 123-4567".into()),
        location: Some("San Francisco, CA".into()),
        website: Some("https://johndeveloper.com".into()),
        linkedin_url: Some("https://linkedin.com/in/johndeveloper".into()),
        github_url: Some("https://github.com/johndeveloper".into()),
    }
}

fn sections() -> ResumeSections {
    ResumeSections {
        work_experience: vec![
            WorkExperience {
                company: "Tech Startup Inc.".into(),
                position: "Senior Software Developer".into(),
                location: Some("San Francisco, CA".into()),
                date: "2022 - Present".into(),
                description: strings(&[
                    "Led development of scalable web applications using React and Node.js",
                    "Implemented CI/CD pipelines reducing deployment time by 60%",
                    "Mentored junior developers and conducted code reviews",
                ]),
                technologies: strings(&["React", "Node.js", "TypeScript", "AWS", "Docker"]),
            },
            WorkExperience {
                company: "Digital Solutions LLC".into(),
                position: "Full Stack Developer".into(),
                location: Some("Remote".into()),
                date: "2020 - 2022".into(),
                description: strings(&[
                    "Built responsive web applications for enterprise clients",
                    "Optimized database queries improving performance by 40%",
                    "Collaborated with design team to implement pixel-perfect UIs",
                ]),
                technologies: strings(&["Vue.js", "Python", "PostgreSQL", "Redis"]),
            },
        ],
        education: vec![Education {
            school: "University of California, Berkeley".into(),
            degree: "Bachelor of Science".into(),
            field: "Computer Science".into(),
            location: Some("Berkeley, CA".into()),
            date: "2016 - 2020".into(),
            gpa: Some(Gpa::Number(3.8)),
            achievements: strings(&["Dean's List", "CS Honor Society"]),
        }],
        skills: vec![
            Skill {
                category: "Programming Languages".into(),
                items: strings(&["JavaScript", "TypeScript", "Python", "Java", "Go"]),
            },
            Skill {
                category: "Frontend Frameworks".into(),
                items: strings(&["React", "Vue.js", "Next.js", "Svelte"]),
            },
            Skill {
                category: "Databases".into(),
                items: strings(&["PostgreSQL", "MongoDB", "Redis", "MySQL"]),
            },
            Skill {
                category: "Cloud & DevOps".into(),
                items: strings(&["AWS", "Docker", "Kubernetes", "CI/CD", "Terraform"]),
            },
        ],
        projects: vec![
            Project {
                name: "AI-Powered Resume Builder".into(),
                description: strings(&[
                    "Built a full-stack application using Next.js and Supabase",
                    "Integrated OpenAI API for intelligent content generation",
                    "Implemented user authentication and real-time collaboration",
                ]),
                date: Some("2024".into()),
                technologies: strings(&["Next.js", "TypeScript", "Supabase", "OpenAI API"]),
                url: Some("https://resume-builder.com".into()),
                github_url: Some("https://github.com/johndeveloper/resume-builder".into()),
            },
            Project {
                name: "E-commerce Platform".into(),
                description: strings(&[
                    "Developed scalable e-commerce solution with microservices architecture",
                    "Implemented payment processing with Stripe integration",
                    "Built admin dashboard with real-time analytics",
                ]),
                date: Some("2023".into()),
                technologies: strings(&["React", "Node.js", "MongoDB", "Stripe API"]),
                url: None,
                github_url: Some("https://github.com/johndeveloper/ecommerce-platform".into()),
            },
        ],
        certifications: vec![Certification {
            name: "AWS Certified Solutions Architect".into(),
            issuer: "Amazon Web Services".into(),
            date_acquired: Some("2023-06-15".into()),
            expiry_date: None,
            credential_id: Some("AWS-SA-2023-123456".into()),
        }],
    }
}

pub fn profile() -> Profile {
    let now = fixture_timestamp();
    Profile {
        id: DEV_USER_ID,
        contact: contact(),
        sections: sections(),
        created_at: now,
        updated_at: now,
    }
}

/// The single base resume. Contact is filled in, content lists are empty.
pub fn base_resume() -> Resume {
    let now = fixture_timestamp();
    Resume {
        id: DEV_BASE_RESUME_ID,
        user_id: DEV_USER_ID,
        job_id: None,
        name: "Software Developer Resume".into(),
        target_role: Some("Full Stack Developer".into()),
        is_base_resume: true,
        contact: contact(),
        sections: ResumeSections::default(),
        has_cover_letter: false,
        section_order: default_section_order(),
        document_settings: None,
        section_configs: None,
        created_at: now,
        updated_at: now,
    }
}

/// Every fixture resume; tailored ones would follow the base.
pub fn resumes() -> Vec<Resume> {
    vec![base_resume()]
}

/// Looks `id` up among the fixture resumes, otherwise invents a tailored
/// resume with that id carrying the fixture profile's content.
pub fn resume_by_id(id: Uuid) -> Resume {
    resumes()
        .into_iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| {
            let now = Utc::now();
            Resume {
                id,
                name: "Mock Tailored Resume".into(),
                target_role: Some("Mock Role".into()),
                is_base_resume: false,
                sections: sections(),
                created_at: now,
                updated_at: now,
                ..base_resume()
            }
        })
}

/// Echoes an update back on top of the fixture shape.
pub fn patched_resume(id: Uuid, patch: &ResumePatch) -> Resume {
    let mut resume = resume_by_id(id);
    resume.apply(patch);
    resume.updated_at = Utc::now();
    resume
}

/// A would-be insert, echoed back with a fresh id.
pub fn inserted_resume(resume: NewResume) -> Resume {
    resume.into_resume(Uuid::new_v4(), Utc::now())
}

pub fn inserted_job(job: NewJob) -> Job {
    job.into_job(Uuid::new_v4(), Utc::now())
}
