use super::notice::Notice;
use crate::client::BackendClient;
use crate::models::{NewProject, Project};

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub struct ProjectsPanel {
    client: BackendClient,
    projects: Vec<Project>,
}

impl ProjectsPanel {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            projects: Vec::new(),
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub async fn load(&mut self) -> Result<usize, Notice> {
        self.projects = self
            .client
            .list_projects()
            .await
            .map_err(|e| Notice::failure("Could not load projects", &e))?;
        Ok(self.projects.len())
    }

    pub async fn create(&mut self, name: &str, department: Option<&str>, description: Option<&str>) -> Notice {
        let name = name.trim();
        if name.is_empty() {
            return Notice::error("Error").with_description("Please fill in project name");
        }

        let request = NewProject {
            name: name.to_string(),
            department: non_empty(department),
            description: non_empty(description),
        };
        match self.client.create_project(&request).await {
            Ok(project) => {
                let notice = Notice::success("Project Created")
                    .with_description(format!("Project \"{}\" has been created successfully", project.name));
                self.projects.push(project);
                notice
            }
            Err(e) => Notice::failure("Could not create project", &e),
        }
    }

    /// Deletes the project with all of its keys and usage records.
    pub async fn delete(&mut self, project_id: i64) -> Notice {
        match self.client.delete_project(project_id).await {
            Ok(_) => {
                self.projects.retain(|p| p.id != project_id);
                Notice::success("Project deleted").with_description("The project and its API keys were removed.")
            }
            Err(e) => Notice::failure("Could not delete project", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_optionals_are_dropped() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(" R&D ")), Some("R&D".to_string()));
    }
}
