pub mod announcements;
pub mod assignments;
pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod enrollment_requests;
pub mod feedback;
pub mod grades;
pub mod notifications;
pub mod profiles;
pub mod realtime;

pub use announcements::configure_announcement_routes;
pub use assignments::configure_assignment_routes;
pub use auth::configure_auth_routes;
pub use courses::configure_course_routes;
pub use dashboard::configure_dashboard_routes;
pub use enrollment_requests::configure_enrollment_request_routes;
pub use feedback::configure_feedback_routes;
pub use grades::configure_grade_routes;
pub use notifications::configure_notification_routes;
pub use profiles::configure_profile_routes;
pub use realtime::configure_realtime_routes;
