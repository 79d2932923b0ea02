//! Single-shot and block-list uploads through the sink

use wiremock::matchers::{
    body_bytes, body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, ResponseTemplate};

use sp2blob_core::ports::IBlobSink;
use sp2blob_storage::blob::{block_id, AzureBlobSink};

use crate::common::{setup_blob_mock, stream_of};

#[tokio::test]
async fn test_small_upload_is_one_put_blob() {
    let (server, client) = setup_blob_mock().await;
    Mock::given(method("PUT"))
        .and(path("/invoices/2024/Q1%20report.pdf"))
        .and(header("x-ms-blob-type", "BlockBlob"))
        .and(header("content-type", "application/pdf"))
        .and(body_bytes(b"hello world".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let sink = AzureBlobSink::new(client);
    let uploaded = sink
        .upload("2024/Q1 report.pdf", stream_of(b"hello world", 3), 11)
        .await
        .unwrap();
    assert_eq!(uploaded, 11);
}

#[tokio::test]
async fn test_large_upload_uses_blocks() {
    let (server, client) = setup_blob_mock().await;
    let data: Vec<u8> = (0..25u8).collect();

    for (index, chunk) in data.chunks(10).enumerate() {
        Mock::given(method("PUT"))
            .and(path("/invoices/big.bin"))
            .and(query_param("comp", "block"))
            .and(query_param("blockid", block_id(index as u64).as_str()))
            .and(body_bytes(chunk.to_vec()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("PUT"))
        .and(path("/invoices/big.bin"))
        .and(query_param("comp", "blocklist"))
        .and(body_string_contains(format!(
            "<BlockList><Latest>{}</Latest><Latest>{}</Latest><Latest>{}</Latest></BlockList>",
            block_id(0),
            block_id(1),
            block_id(2)
        )))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let sink = AzureBlobSink::new(client)
        .with_upload_threshold(16)
        .with_chunk_size(10);
    let uploaded = sink
        .upload("big.bin", stream_of(&data, 7), data.len() as u64)
        .await
        .unwrap();
    assert_eq!(uploaded, 25);
}

#[tokio::test]
async fn test_understated_size_switches_to_blocks() {
    let (server, client) = setup_blob_mock().await;
    let data: Vec<u8> = (0..100u8).collect();

    Mock::given(method("PUT"))
        .and(path("/invoices/grown.bin"))
        .and(query_param_is_missing("comp"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    for (index, chunk) in data.chunks(10).enumerate() {
        Mock::given(method("PUT"))
            .and(path("/invoices/grown.bin"))
            .and(query_param("comp", "block"))
            .and(query_param("blockid", block_id(index as u64).as_str()))
            .and(body_bytes(chunk.to_vec()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("PUT"))
        .and(path("/invoices/grown.bin"))
        .and(query_param("comp", "blocklist"))
        .and(body_string_contains(block_id(9)))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let sink = AzureBlobSink::new(client)
        .with_upload_threshold(16)
        .with_chunk_size(10);
    let uploaded = sink
        .upload("grown.bin", stream_of(&data, 7), 0)
        .await
        .unwrap();
    assert_eq!(uploaded, 100);
}

#[tokio::test]
async fn test_failed_upload_reports_blob_name() {
    let (server, client) = setup_blob_mock().await;
    Mock::given(method("PUT"))
        .and(path("/invoices/a.pdf"))
        .respond_with(
            ResponseTemplate::new(500)
                .append_header("x-ms-error-code", "InternalError")
                .set_body_string("<Error><Code>InternalError</Code><Message>boom</Message></Error>"),
        )
        .mount(&server)
        .await;

    let err = AzureBlobSink::new(client)
        .upload("a.pdf", stream_of(b"x", 1), 1)
        .await
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("a.pdf"), "{msg}");
    assert!(msg.contains("boom"), "{msg}");
}
