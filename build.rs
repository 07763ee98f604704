fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/project_helper/v1/helper.proto");
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/project_helper/v1/helper.proto"], &["proto"])?;
    Ok(())
}
