use chrono::Utc;

fn main() {
    let now = Utc::now();
    println!("cargo:rustc-env=BUILD_TIME={}", now.to_rfc3339());
}
