//! Projects that transactions are booked against.

mod db;
mod domain;
mod endpoints;

pub use db::{create_project, create_project_table, delete_project, get_project, update_project};
pub use domain::{Project, ProjectData, ProjectId};
pub use endpoints::{
    create_project_endpoint, delete_project_endpoint, get_project_endpoint,
    list_projects_endpoint, update_project_endpoint,
};
