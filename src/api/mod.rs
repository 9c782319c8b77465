use rocket::Route;

mod questions;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(questions::routes());
    routes
}
