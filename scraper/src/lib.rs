pub mod banner;
pub mod catalog;
pub mod courses;
pub mod error;
pub mod html;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod settings;

pub use banner::{Banner, BannerSession, FetchSession, SessionFactory};
pub use catalog::{Catalog, CatalogInfo};
pub use error::{CourseError, Error, Result};
pub use model::{CourseIdentifier, CourseSection, ExportRow, MeetingOccurrence, SectionDetail};
pub use pipeline::{Aggregate, Pipeline};
pub use settings::{PrimePolicy, Settings};

/// Sections of one course with their meeting times. The first failure aborts.
pub async fn course_details(
    session: &dyn FetchSession,
    subject: &str,
    number: &str,
) -> Result<Vec<SectionDetail>> {
    let sections = session.search(subject, number).await?;

    let mut details = Vec::with_capacity(sections.len());
    for section in sections {
        if section.crn.is_empty() {
            continue;
        }
        let meetings = session.meeting_times(&section.crn).await?;
        details.push(SectionDetail { section, meetings });
    }

    Ok(details)
}
