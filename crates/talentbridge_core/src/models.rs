use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Professional,
    Recruiter,
    Company,
}

impl Default for UserKind {
    fn default() -> Self {
        Self::Professional
    }
}

/// A signed-in user as the client sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UserKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuthResponse {
    pub admin: Admin,
    pub token: String,
}

/// A candidate parked in the waiting room of a call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaitingRoomEntry {
    pub call_id: String,
    pub candidate_name: String,
    pub is_admitted: bool,
    /// Epoch milliseconds of the last registration.
    pub timestamp: i64,
}

impl WaitingRoomEntry {
    pub fn matches(&self, call_id: &str, candidate_name: &str) -> bool {
        self.call_id == call_id && self.candidate_name == candidate_name
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Video,
    Audio,
}

impl Default for CallType {
    fn default() -> Self {
        Self::Video
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl CallStatus {
    pub fn can_transition_to(self, next: CallStatus) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Completed)
                | (Self::Scheduled, Self::Cancelled)
                | (Self::Completed, Self::Completed)
                | (Self::Cancelled, Self::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCall {
    pub id: String,
    pub date: String,
    pub time: String,
    /// Minutes.
    pub duration: u32,
    pub call_type: CallType,
    #[serde(default)]
    pub notes: String,
    pub candidate_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    pub status: CallStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCallInput {
    pub date: String,
    pub time: String,
    pub duration: u32,
    #[serde(default)]
    pub call_type: CallType,
    #[serde(default)]
    pub notes: String,
    pub candidate_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub posted_by: String,
    pub posted_at: String,
    pub applicants: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobInput {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub salary: Option<String>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    pub search: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: String,
    pub job_id: String,
    pub user_id: String,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    pub applied_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub likes: u32,
    #[serde(default)]
    pub liked_by: Vec<String>,
    pub comments: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: ConnectionStatus,
    pub created_at: String,
}

/// Review state shared by every moderation queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn can_transition_to(self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn target(self) -> ReviewStatus {
        match self {
            Self::Approve => ReviewStatus::Approved,
            Self::Reject => ReviewStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModerationApplication {
    pub id: String,
    pub kind: UserKind,
    pub applicant_name: String,
    pub email: String,
    #[serde(default)]
    pub details: String,
    pub status: ReviewStatus,
    pub submitted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationInput {
    pub kind: UserKind,
    pub applicant_name: String,
    pub email: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    pub posted_by: String,
    pub status: ReviewStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStats {
    pub professional_applications: QueueStats,
    pub recruiter_applications: QueueStats,
    pub company_applications: QueueStats,
    pub job_postings: QueueStats,
    pub companies: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallControls {
    pub muted: bool,
    pub video_enabled: bool,
    pub speaker_on: bool,
}

impl CallControls {
    pub fn for_call_type(call_type: CallType) -> Self {
        Self {
            muted: false,
            video_enabled: call_type == CallType::Video,
            speaker_on: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCallParams {
    pub call_id: String,
    pub candidate_name: String,
    #[serde(default)]
    pub call_type: CallType,
    #[serde(default)]
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCallSnapshot {
    pub call_id: String,
    pub candidate_name: String,
    pub call_type: CallType,
    pub job_title: Option<String>,
    pub controls: CallControls,
    pub elapsed_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallSummary {
    pub call_id: String,
    pub elapsed_seconds: u64,
    pub scheduled_call_updated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallLifecycleState {
    Active,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStateEvent {
    pub call_id: String,
    pub state: CallLifecycleState,
    pub elapsed_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTickEvent {
    pub call_id: String,
    pub elapsed_seconds: u64,
}

/// Pushed to the candidate when the host lets them into the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmittedEvent {
    pub call_id: String,
    pub candidate_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_type: Option<CallType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_room_entry_wire_format() {
        let entry: WaitingRoomEntry = serde_json::from_str(
            r#"{"callId":"c1","candidateName":"Amara","isAdmitted":false,"timestamp":1000}"#,
        )
        .unwrap();
        assert!(entry.matches("c1", "Amara"));
        assert!(!entry.matches("c2", "Amara"));
    }

    #[test]
    fn test_call_status_transitions() {
        assert!(CallStatus::Scheduled.can_transition_to(CallStatus::Completed));
        assert!(CallStatus::Scheduled.can_transition_to(CallStatus::Cancelled));
        assert!(!CallStatus::Cancelled.can_transition_to(CallStatus::Completed));
        assert!(!CallStatus::Completed.can_transition_to(CallStatus::Scheduled));
    }

    #[test]
    fn test_review_status_only_leaves_pending() {
        assert!(ReviewStatus::Pending.can_transition_to(ReviewDecision::Approve.target()));
        assert!(!ReviewStatus::Approved.can_transition_to(ReviewStatus::Rejected));
    }

    #[test]
    fn test_user_kind_serializes_as_type() {
        let user = User {
            id: "1".to_string(),
            email: "a@b.c".to_string(),
            name: "A".to_string(),
            kind: UserKind::Recruiter,
            headline: None,
            location: None,
            bio: None,
            skills: Vec::new(),
            is_premium: None,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["type"], "recruiter");
        assert!(value.get("headline").is_none());
    }
}
