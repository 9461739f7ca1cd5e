//! Schedule export: CSV serialisation of an amortisation schedule and the
//! sinks that persist the generated file.

pub mod serializer;
pub mod download;

pub use self::serializer::{schedule_to_csv, ScheduleRecord, CSV_HEADER};
pub use self::download::{
    download_payload, export_schedule, DownloadPayload, DownloadSink, FileSink, MemorySink,
    EXPORT_FILENAME, EXPORT_MIME_TYPE,
};
