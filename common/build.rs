fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc_path = protoc_bin_vendored::protoc_bin_path()?;
    unsafe {
        std::env::set_var("PROTOC", protoc_path);
    }

    println!("cargo:rerun-if-changed=../proto/tictactoe.proto");

    tonic_prost_build::configure()
        .build_client(false)
        .compile_protos(&["../proto/tictactoe.proto"], &["../proto"])?;

    Ok(())
}
