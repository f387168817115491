//! Streams the weather log and cuts it into bounded chunks of CSV rows.

use std::{fmt, io, path::PathBuf};

use bytes::{Buf, BytesMut};
use csv::StringRecord;
use csv_core::{ReadRecordResult, Reader};
use futures::{
    stream::{self, BoxStream},
    Stream, StreamExt, TryStreamExt,
};
use tokio::{fs::File, io::AsyncRead};
use tokio_util::{
    codec::{Decoder, FramedRead},
    io::StreamReader,
};
use tracing::{debug, error, info};

use crate::{
    error::{Result, WeatherError},
    reading::{ColumnIndex, RawChunk},
};

/// Parsed CSV records of the source as they arrive.
pub type RecordStream = BoxStream<'static, Result<StringRecord>>;

const FIELD_BUFFER: usize = 1024;
const FIELD_ENDS: usize = 32;

#[derive(Debug, Clone, PartialEq)]
/// Where the weather log is read from.
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Source {
    pub async fn open(&self) -> Result<RecordStream> {
        match self {
            Source::Url(url) => fetch_stream(url).await,
            Source::File(path) => read_file_stream(path).await,
        }
    }
}

/// Issues a streaming GET for `url`.
pub async fn fetch_stream(url: &str) -> Result<RecordStream> {
    let fetch_error = |reason: String| {
        let e = WeatherError::DataFetch {
            url: url.to_string(),
            reason,
        };
        error!("{}", e);
        e
    };

    let response = reqwest::get(url)
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fetch_error(format!("server responded {}", response.status())));
    }

    info!("Streaming `{}`", url);
    let bytes = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));

    Ok(records(StreamReader::new(bytes), url.to_string()))
}

/// Reads a local CSV.
pub async fn read_file_stream(path: &PathBuf) -> Result<RecordStream> {
    let file = File::open(path).await.map_err(|e| {
        let e = WeatherError::DataFetch {
            url: path.display().to_string(),
            reason: e.to_string(),
        };
        error!("{}", e);
        e
    })?;

    info!("Reading `{}`", path.display());
    Ok(records(file, path.display().to_string()))
}

/// Frames `reader` into CSV records. `origin` names the source in errors.
pub fn records<R>(reader: R, origin: String) -> RecordStream
where
    R: AsyncRead + Send + 'static,
{
    FramedRead::new(reader, RecordDecoder::default())
        .map_err(move |e| {
            let e = match e {
                DecodeError::Io(e) => WeatherError::DataFetch {
                    url: origin.clone(),
                    reason: e.to_string(),
                },
                DecodeError::Csv(e) => e,
            };
            error!("{}", e);
            e
        })
        .boxed()
}

#[derive(Debug)]
enum DecodeError {
    Io(io::Error),
    Csv(WeatherError),
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::Io(e)
    }
}

/// Decodes complete CSV records, so quoted fields may span lines.
///
/// The `csv_core` reader keeps its state between calls, so bytes are consumed
/// as soon as they are seen and a partial record waits in `output`.
struct RecordDecoder {
    reader: Reader,
    output: Vec<u8>,
    ends: Vec<usize>,
    output_len: usize,
    ends_len: usize,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        RecordDecoder {
            reader: Reader::new(),
            output: vec![0; FIELD_BUFFER],
            ends: vec![0; FIELD_ENDS],
            output_len: 0,
            ends_len: 0,
        }
    }
}

impl RecordDecoder {
    fn read(
        &mut self,
        src: &mut BytesMut,
        eof: bool,
    ) -> std::result::Result<Option<StringRecord>, DecodeError> {
        loop {
            // An empty input tells the reader the stream has ended.
            if src.is_empty() && !eof {
                return Ok(None);
            }

            let (result, read, written, ended) = self.reader.read_record(
                &src[..],
                &mut self.output[self.output_len..],
                &mut self.ends[self.ends_len..],
            );
            src.advance(read);
            self.output_len += written;
            self.ends_len += ended;

            match result {
                ReadRecordResult::InputEmpty => {}
                ReadRecordResult::OutputFull => {
                    let len = self.output.len() * 2;
                    self.output.resize(len, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len() * 2;
                    self.ends.resize(len, 0);
                }
                ReadRecordResult::Record => return self.take_record().map(Some),
                ReadRecordResult::End => return Ok(None),
            }
        }
    }

    fn take_record(&mut self) -> std::result::Result<StringRecord, DecodeError> {
        let output = &self.output[..self.output_len];
        let mut fields = Vec::with_capacity(self.ends_len);
        let mut start = 0;
        for &end in &self.ends[..self.ends_len] {
            let field = std::str::from_utf8(&output[start..end]).map_err(|e| {
                DecodeError::Csv(WeatherError::DataLoading(format!(
                    "record is not valid UTF-8: {}",
                    e
                )))
            })?;
            fields.push(field);
            start = end;
        }
        let record = StringRecord::from(fields);

        self.output_len = 0;
        self.ends_len = 0;
        Ok(record)
    }
}

impl Decoder for RecordDecoder {
    type Item = StringRecord;
    type Error = DecodeError;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        self.read(src, false)
    }

    fn decode_eof(
        &mut self,
        src: &mut BytesMut,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        self.read(src, true)
    }
}

/// Groups a record stream into header-validated chunks of `chunk_size` rows.
///
/// The first non-blank record is the header. At most one chunk of rows is
/// held in memory.
pub struct ChunkSource {
    records: RecordStream,
    chunk_size: usize,
    header: Option<Vec<String>>,
    chunks_emitted: usize,
}

impl ChunkSource {
    pub fn new(records: RecordStream, chunk_size: usize) -> Self {
        ChunkSource {
            records,
            chunk_size: chunk_size.max(1),
            header: None,
            chunks_emitted: 0,
        }
    }

    /// Returns the next chunk, or `None` once the stream is drained.
    pub async fn next_chunk(&mut self) -> Result<Option<RawChunk>> {
        let header = match &self.header {
            Some(header) => header.clone(),
            None => self.read_header().await?,
        };

        let mut rows = Vec::with_capacity(self.chunk_size);
        while rows.len() < self.chunk_size {
            let Some(record) = self.records.try_next().await? else {
                break;
            };
            if record.len() > header.len() {
                let e = WeatherError::DataLoading(format!(
                    "row has {} fields but the header has {}: {:?}",
                    record.len(),
                    header.len(),
                    record
                ));
                error!("{}", e);
                return Err(e);
            }
            rows.push(record);
        }

        if rows.is_empty() {
            debug!("Source drained after {} chunks", self.chunks_emitted);
            return Ok(None);
        }

        self.chunks_emitted += 1;
        debug!("Chunk {} holds {} rows", self.chunks_emitted, rows.len());

        Ok(Some(RawChunk { header, rows }))
    }

    /// Turns the source into a stream of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<RawChunk>> {
        stream::try_unfold(self, |mut source| async move {
            let chunk = source.next_chunk().await?;
            Ok::<_, WeatherError>(chunk.map(|chunk| (chunk, source)))
        })
    }

    async fn read_header(&mut self) -> Result<Vec<String>> {
        while let Some(record) = self.records.try_next().await? {
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let header: Vec<String> = record.iter().map(String::from).collect();
            ColumnIndex::from_header(&header).map_err(|e| {
                error!("{}", e);
                e
            })?;
            debug!("Header has {} columns", header.len());
            self.header = Some(header.clone());
            return Ok(header);
        }

        let e = WeatherError::DataLoading("source contains no header row".to_string());
        error!("{}", e);
        Err(e)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use bytes::Bytes;
    use tempfile::NamedTempFile;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    const HEADER: &str = "Date,Time,Outside Temperature,Hi Temperature,Low Temperature,Rain";

    fn record_stream(parts: Vec<&'static str>) -> RecordStream {
        let bytes = stream::iter(
            parts
                .into_iter()
                .map(|p| Ok::<_, io::Error>(Bytes::from_static(p.as_bytes()))),
        );
        records(StreamReader::new(bytes), "memory".to_string())
    }

    async fn collect(records: RecordStream, chunk_size: usize) -> Result<Vec<RawChunk>> {
        ChunkSource::new(records, chunk_size)
            .into_stream()
            .try_collect()
            .await
    }

    #[tokio::test]
    async fn should_cut_rows_into_fixed_size_chunks() {
        let csv = "Date,Time,Outside Temperature,Hi Temperature,Low Temperature\r\n\
                   31/05/2006,09:00,9.3,9.7,9.1\r\n\
                   31/05/2006,09:10,10.1,10.4,9.7\r\n\
                   01/06/2006,09:20,10.7,11.0,10.4\r\n";
        let mut source = ChunkSource::new(record_stream(vec![csv]), 2);

        let first = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(&first.rows[1][1], "09:10");

        let second = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(&second.rows[0][0], "01/06/2006");
        assert_eq!(second.header.len(), 5);

        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_join_records_split_across_network_buffers() {
        let parts = vec![
            "Date,Time,Outside Temp",
            "erature,Hi Temperature,Low Temperature,Rain\n31/05/20",
            "06,09:00,9.3,9.7,9.1,0\n31/05/2006,09:1",
            "0,10.1,10.4,9.7,0",
        ];
        let chunks = collect(record_stream(parts), 1024).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].header[2], "Outside Temperature");
        assert_eq!(&chunks[0].rows[0][0], "31/05/2006");
        assert_eq!(&chunks[0].rows[1][1], "09:10");
        assert_eq!(&chunks[0].rows[1][5], "0");
    }

    #[tokio::test]
    async fn should_keep_quoted_newlines_inside_one_row() {
        let parts = vec![
            "Date,Time,Outside Temperature,Hi Temperature,Low Temperature,Rain\n",
            "31/05/2006,09:00,9.3,9.7,9.1,\"line one\n",
            "line two\"\n31/05/2006,09:10,10.1,10.4,9.7,ok\n",
        ];
        let chunks = collect(record_stream(parts), 1024).await.unwrap();

        assert_eq!(chunks[0].len(), 2);
        assert_eq!(&chunks[0].rows[0][5], "line one\nline two");
        assert_eq!(&chunks[0].rows[1][5], "ok");
    }

    #[tokio::test]
    async fn should_grow_buffers_for_wide_records() {
        let wide = format!("{}{}\n", HEADER, ",x".repeat(200));
        let row = format!(
            "31/05/2006,09:00,9.3,9.7,9.1,{}{}\n",
            "7".repeat(3000),
            ",y".repeat(200)
        );
        let bytes = stream::iter(vec![Ok::<_, io::Error>(Bytes::from(wide + &row))]);

        let chunks = collect(records(StreamReader::new(bytes), "memory".to_string()), 8)
            .await
            .unwrap();

        assert_eq!(chunks[0].rows[0].len(), 206);
        assert_eq!(chunks[0].rows[0][5].len(), 3000);
    }

    #[tokio::test]
    async fn should_skip_blank_lines() {
        let parts = vec!["\n\n", HEADER, "\n\n31/05/2006,09:00,9.3,9.7,9.1,0\n\n"];
        let chunks = collect(record_stream(parts), 8).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 1);
    }

    #[tokio::test]
    async fn should_reject_missing_columns() {
        let mut source = ChunkSource::new(record_stream(vec!["c1,c2\nd1,d2\n"]), 8);

        assert!(matches!(
            source.next_chunk().await,
            Err(WeatherError::DataValidation { .. })
        ));
    }

    #[tokio::test]
    async fn should_reject_rows_longer_than_header() {
        let csv = format!("{}\n31/05/2006,09:00,9.3,9.7,9.1,0,extra\n", HEADER);
        let bytes = stream::iter(vec![Ok::<_, io::Error>(Bytes::from(csv))]);
        let mut source =
            ChunkSource::new(records(StreamReader::new(bytes), "memory".to_string()), 8);

        assert!(matches!(
            source.next_chunk().await,
            Err(WeatherError::DataLoading(_))
        ));
    }

    #[tokio::test]
    async fn should_reject_invalid_utf8() {
        let mut csv = format!("{}\n31/05/2006,09:00,9.3,9.7,9.1,", HEADER).into_bytes();
        csv.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let bytes = stream::iter(vec![Ok::<_, io::Error>(Bytes::from(csv))]);
        let mut source =
            ChunkSource::new(records(StreamReader::new(bytes), "memory".to_string()), 8);

        assert!(matches!(
            source.next_chunk().await,
            Err(WeatherError::DataLoading(_))
        ));
    }

    #[tokio::test]
    async fn should_fail_on_empty_source() {
        let mut source = ChunkSource::new(record_stream(vec![]), 8);

        assert!(matches!(
            source.next_chunk().await,
            Err(WeatherError::DataLoading(_))
        ));
    }

    #[tokio::test]
    async fn should_propagate_transport_errors() {
        let bytes = stream::iter(vec![
            Ok(Bytes::from(format!("{}\n", HEADER))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ]);
        let records = records(StreamReader::new(bytes), "http://example.invalid".to_string());
        let mut source = ChunkSource::new(records, 8);

        assert!(matches!(
            source.next_chunk().await,
            Err(WeatherError::DataFetch { .. })
        ));
    }

    #[tokio::test]
    async fn should_read_local_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for minute in 0..5 {
            writeln!(file, "31/05/2006,09:{:02},9.3,9.7,9.1,0", minute * 10).unwrap();
        }

        let source = Source::File(file.path().to_path_buf());
        let chunks = collect(source.open().await.unwrap(), 2).await.unwrap();

        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn should_report_missing_local_file_as_fetch_error() {
        let source = Source::File(PathBuf::from("/definitely/not/here.csv"));

        assert!(matches!(
            source.open().await,
            Err(WeatherError::DataFetch { .. })
        ));
    }

    const SERVED_LOG: &str = "Date,Time,Outside Temperature,Hi Temperature,Low Temperature\n\
                              31/05/2006,09:00,9.3,9.7,9.1\n\
                              31/05/2006,09:10,10.1,10.4,9.7\n\
                              01/06/2006,09:20,10.7,11.0,10.4\n";

    /// Serves `SERVED_LOG` at `/log.csv` and 404 elsewhere.
    async fn serve_log() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buffer = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buffer).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buffer[..n]),
                    }
                }

                let (status, body) = if request.starts_with(b"GET /log.csv ") {
                    ("200 OK", SERVED_LOG)
                } else {
                    ("404 Not Found", "not found")
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn should_report_http_error_status_as_fetch_error() {
        let base = serve_log().await;

        let result = fetch_stream(&format!("{}/missing.csv", base)).await;

        assert!(matches!(
            result,
            Err(WeatherError::DataFetch { reason, .. }) if reason.contains("404")
        ));
    }

    #[tokio::test]
    async fn should_stream_chunks_over_http() {
        let base = serve_log().await;

        let source = Source::Url(format!("{}/log.csv", base));
        let chunks = collect(source.open().await.unwrap(), 2).await.unwrap();

        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(&chunks[1].rows[0][0], "01/06/2006");
    }

    #[tokio::test]
    async fn should_report_unreachable_host_as_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(matches!(
            fetch_stream(&format!("http://{}/log.csv", addr)).await,
            Err(WeatherError::DataFetch { .. })
        ));
    }
}
