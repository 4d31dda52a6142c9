pub mod dashboard;
pub mod descriptor;
pub mod validation;
