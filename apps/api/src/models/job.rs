use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkLocation {
    Remote,
    InPerson,
    Hybrid,
}

impl WorkLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkLocation::Remote => "remote",
            WorkLocation::InPerson => "in_person",
            WorkLocation::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remote" => Some(WorkLocation::Remote),
            "in_person" => Some(WorkLocation::InPerson),
            "hybrid" => Some(WorkLocation::Hybrid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    CoOp,
    Internship,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full_time",
            EmploymentType::PartTime => "part_time",
            EmploymentType::CoOp => "co_op",
            EmploymentType::Internship => "internship",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full_time" => Some(EmploymentType::FullTime),
            "part_time" => Some(EmploymentType::PartTime),
            "co_op" => Some(EmploymentType::CoOp),
            "internship" => Some(EmploymentType::Internship),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub position_title: Option<String>,
    pub job_url: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub keywords: Vec<String>,
    pub work_location: Option<WorkLocation>,
    pub employment_type: Option<EmploymentType>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A job listing as submitted by the client (or produced by the job parser).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobListing {
    pub company_name: Option<String>,
    pub position_title: Option<String>,
    pub job_url: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub work_location: Option<WorkLocation>,
    pub employment_type: Option<EmploymentType>,
}

/// Insert payload for a job; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub position_title: Option<String>,
    pub job_url: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub keywords: Vec<String>,
    pub work_location: Option<WorkLocation>,
    pub employment_type: Option<EmploymentType>,
    pub is_active: bool,
}

impl NewJob {
    /// A populated listing. Missing location/type fall back to in-person, full-time.
    pub fn from_listing(user_id: Uuid, listing: JobListing) -> Self {
        Self {
            user_id,
            company_name: listing.company_name,
            position_title: listing.position_title,
            job_url: listing.job_url,
            description: listing.description,
            location: listing.location,
            salary_range: listing.salary_range,
            keywords: listing.keywords,
            work_location: Some(listing.work_location.unwrap_or(WorkLocation::InPerson)),
            employment_type: Some(listing.employment_type.unwrap_or(EmploymentType::FullTime)),
            is_active: true,
        }
    }

    /// Placeholder job the user fills in later.
    pub fn placeholder(user_id: Uuid) -> Self {
        Self {
            user_id,
            company_name: Some("New Company".to_string()),
            position_title: Some("New Position".to_string()),
            job_url: None,
            description: None,
            location: None,
            salary_range: None,
            keywords: Vec::new(),
            work_location: None,
            employment_type: None,
            is_active: true,
        }
    }

    pub fn into_job(self, id: Uuid, now: DateTime<Utc>) -> Job {
        Job {
            id,
            user_id: self.user_id,
            company_name: self.company_name,
            position_title: self.position_title,
            job_url: self.job_url,
            description: self.description,
            location: self.location,
            salary_range: self.salary_range,
            keywords: self.keywords,
            work_location: self.work_location,
            employment_type: self.employment_type,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Conjunctive listing filters. Keywords match when the job's set contains all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub work_location: Option<WorkLocation>,
    pub employment_type: Option<EmploymentType>,
    pub keywords: Vec<String>,
}

impl JobFilter {
    #[cfg(test)]
    pub fn matches(&self, job: &Job) -> bool {
        if !job.is_active {
            return false;
        }
        if self.work_location.is_some() && job.work_location != self.work_location {
            return false;
        }
        if self.employment_type.is_some() && job.employment_type != self.employment_type {
            return false;
        }
        self.keywords.iter().all(|k| job.keywords.contains(k))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total_count: i64,
    pub current_page: u32,
    pub total_pages: u32,
}
