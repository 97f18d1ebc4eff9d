//! Paginated listing of a group's projects

use tracing::debug;

use crate::config::MAX_PER_PAGE;
use crate::host::ProjectHost;
use crate::project::Project;
use crate::Result;

/// Walks a group's projects page by page until an empty page comes back
///
/// The lister is lazy and single-use: once it has seen the empty page, or
/// a request has failed, every further call yields `None`.
pub struct ProjectLister<'a, H: ProjectHost + ?Sized> {
    host: &'a H,
    group_id: u64,
    per_page: u32,
    next_page: u32,
    exhausted: bool,
}

impl<'a, H: ProjectHost + ?Sized> ProjectLister<'a, H> {
    /// Create a lister; `per_page` is clamped to 1..=100
    pub fn new(host: &'a H, group_id: u64, per_page: u32) -> Self {
        Self {
            host,
            group_id,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            next_page: 1,
            exhausted: false,
        }
    }

    /// Page size actually requested
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Fetch the next non-empty page, or `None` once the listing is done
    pub async fn next_page(&mut self) -> Result<Option<Vec<Project>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self.next_page;
        let projects = match self
            .host
            .list_projects_page(self.group_id, page, self.per_page)
            .await
        {
            Ok(projects) => projects,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        debug!(group_id = self.group_id, page, count = projects.len(), "Fetched project page");

        if projects.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.next_page += 1;
        Ok(Some(projects))
    }

    /// Drain every remaining page into one list
    pub async fn collect_all(mut self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        while let Some(page) = self.next_page().await? {
            projects.extend(page);
        }
        Ok(projects)
    }
}
