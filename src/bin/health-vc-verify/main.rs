use std::process::exit;

use health_vc::{
    sniff, CredentialEnvelope, NoRevocationData, TrustAnchorKey, ValidityEngine,
    VerificationOptions,
};

fn usage() {
    eprintln!("Usage: health-vc-verify <decode|verify> <credential-file> [keys.json] [options.json]");
}

fn fail(message: String) -> ! {
    eprintln!("{}", message);
    exit(1);
}

fn read_file(filename: &str) -> Vec<u8> {
    std::fs::read(filename)
        .unwrap_or_else(|err| fail(format!("Unable to read {}: {}", filename, err)))
}

fn read_json<T: serde::de::DeserializeOwned>(filename: &str) -> T {
    serde_json::from_slice(&read_file(filename))
        .unwrap_or_else(|err| fail(format!("Unable to parse {}: {}", filename, err)))
}

fn decode(filename: &str) -> CredentialEnvelope {
    sniff(&read_file(filename))
        .unwrap_or_else(|err| fail(format!("Unable to decode {}: {}", filename, err)))
}

fn write_json(value: serde_json::Value) {
    match serde_json::to_string_pretty(&value) {
        Ok(text) => println!("{}", text),
        Err(err) => fail(format!("Unable to write output: {}", err)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 5 {
        return usage();
    }
    let envelope = decode(&args[2]);
    match &args[1][..] {
        "decode" => write_json(serde_json::json!({
            "format": envelope.format(),
            "claims": envelope.claims(),
        })),
        "verify" => {
            let keys: Vec<TrustAnchorKey> = match args.get(3) {
                Some(filename) => read_json(filename),
                None => Vec::new(),
            };
            let options: VerificationOptions = match args.get(4) {
                Some(filename) => read_json(filename),
                None => VerificationOptions::default(),
            };
            let outcome = ValidityEngine::new(options)
                .evaluate(&envelope, &keys, &NoRevocationData)
                .await;
            write_json(serde_json::json!({
                "format": envelope.format(),
                "claims": envelope.claims(),
                "outcome": outcome,
            }));
            if outcome.is_invalid() {
                exit(2);
            }
        }
        _ => usage(),
    }
}
