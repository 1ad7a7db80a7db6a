use crate::models::{
    Connection, ConnectionStatus, Job, JobType, Post, User, UserKind,
};

use super::{BackendState, UserRecord};

pub(super) const SAMPLE_PASSWORD: &str = "password123";

pub(super) fn populate(state: &mut BackendState) {
    state.users.extend([
        sample_user(
            "1",
            "sarah.chen@example.com",
            "Sarah Chen",
            UserKind::Professional,
            Some("Senior Software Engineer"),
            Some("San Francisco, CA"),
            &["Rust", "TypeScript", "Distributed Systems"],
        ),
        sample_user(
            "2",
            "marcus.j@talentfinders.com",
            "Marcus Johnson",
            UserKind::Recruiter,
            Some("Technical Recruiter at TalentFinders"),
            Some("New York, NY"),
            &["Sourcing", "Interviewing"],
        ),
        sample_user(
            "3",
            "hiring@techcorp.io",
            "TechCorp",
            UserKind::Company,
            Some("Building developer tools"),
            Some("Austin, TX"),
            &[],
        ),
    ]);

    state.jobs.extend([
        Job {
            id: "1".to_string(),
            title: "Senior Backend Engineer".to_string(),
            company: "TechCorp".to_string(),
            location: "Austin, TX".to_string(),
            job_type: JobType::FullTime,
            salary: Some("$150k - $190k".to_string()),
            description: "Own the services behind our developer platform.".to_string(),
            requirements: vec![
                "5+ years backend experience".to_string(),
                "Experience with Rust or Go".to_string(),
            ],
            posted_by: "3".to_string(),
            posted_at: "2026-09-01T09:00:00.000Z".to_string(),
            applicants: 12,
        },
        Job {
            id: "2".to_string(),
            title: "Product Designer".to_string(),
            company: "TalentFinders".to_string(),
            location: "Remote".to_string(),
            job_type: JobType::Remote,
            salary: None,
            description: "Shape hiring workflows used by thousands of teams.".to_string(),
            requirements: vec!["Portfolio of shipped product work".to_string()],
            posted_by: "2".to_string(),
            posted_at: "2026-09-10T15:30:00.000Z".to_string(),
            applicants: 4,
        },
        Job {
            id: "3".to_string(),
            title: "Data Engineering Intern".to_string(),
            company: "TechCorp".to_string(),
            location: "Austin, TX".to_string(),
            job_type: JobType::Internship,
            salary: Some("$35/hr".to_string()),
            description: "Help build the pipelines behind our analytics.".to_string(),
            requirements: vec!["SQL".to_string()],
            posted_by: "3".to_string(),
            posted_at: "2026-09-20T12:00:00.000Z".to_string(),
            applicants: 0,
        },
    ]);

    state.posts.extend([
        Post {
            id: "1".to_string(),
            author_id: "1".to_string(),
            author_name: "Sarah Chen".to_string(),
            content: "Just shipped a zero-downtime migration of our event pipeline.".to_string(),
            likes: 24,
            liked_by: Vec::new(),
            comments: 5,
            created_at: "2026-09-28T08:15:00.000Z".to_string(),
        },
        Post {
            id: "2".to_string(),
            author_id: "2".to_string(),
            author_name: "Marcus Johnson".to_string(),
            content: "We're hiring backend engineers in Austin. DM me!".to_string(),
            likes: 9,
            liked_by: Vec::new(),
            comments: 2,
            created_at: "2026-09-29T17:40:00.000Z".to_string(),
        },
        Post {
            id: "3".to_string(),
            author_id: "3".to_string(),
            author_name: "TechCorp".to_string(),
            content: "Our fall internship applications are open.".to_string(),
            likes: 41,
            liked_by: Vec::new(),
            comments: 11,
            created_at: "2026-09-30T10:00:00.000Z".to_string(),
        },
    ]);

    state.connections.push(Connection {
        id: "1".to_string(),
        from_user_id: "1".to_string(),
        to_user_id: "2".to_string(),
        status: ConnectionStatus::Accepted,
        created_at: "2026-08-15T11:00:00.000Z".to_string(),
    });
}

fn sample_user(
    id: &str,
    email: &str,
    name: &str,
    kind: UserKind,
    headline: Option<&str>,
    location: Option<&str>,
    skills: &[&str],
) -> UserRecord {
    UserRecord {
        user: User {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            kind,
            headline: headline.map(str::to_string),
            location: location.map(str::to_string),
            bio: None,
            skills: skills.iter().map(|skill| skill.to_string()).collect(),
            is_premium: Some(false),
        },
        password: SAMPLE_PASSWORD.to_string(),
    }
}
