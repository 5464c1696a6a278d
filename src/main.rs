#[actix_web::main]
async fn main() -> std::io::Result<()> {
    demand_letter_server::run().await
}
