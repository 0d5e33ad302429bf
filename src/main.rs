use rocket::launch;

#[launch]
fn rocket() -> _ {
    academia_api::rocket()
}
