#[rocket::launch]
fn rocket() -> _ {
    let rocket = hackdin::rocket();
    log::info!("Starting Hackdin API Server");
    rocket
}
