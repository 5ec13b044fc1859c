use anyhow::{anyhow, Context, Result};
use arrow::{datatypes::Schema as ArrowSchema, record_batch::RecordBatch};
use chrono::Utc;
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs::{self, File},
    io::BufWriter,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info};

const CONSOLIDATED: &str = "consolidated.parquet";

/// A row type stored in a [`PartitionedTable`].
/// - Defines the schema, the partition a row lands in and its dedupe key.
/// - Converts whole batches to and from Arrow.
pub trait TableRow: Sized {
    /// Arrow schema for this row type
    fn schema() -> Arc<ArrowSchema>;
    /// Hive partition directory name, e.g. `year=2022`
    fn partition(&self) -> String;
    /// Unique dedupe key for this row
    fn unique_key(&self) -> String;
    /// Convert rows into one batch matching `schema()`
    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;
    /// Convert a batch read back from disk into rows
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct InsertSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Generic hive-partitioned Parquet table with skip-on-conflict inserts.
///
/// Layout: `<base>/<table>/<partition>/*.parquet`. Rows are written in
/// files of at most `batch_size` rows; batching never changes which rows
/// are stored.
pub struct PartitionedTable<R: TableRow> {
    base_dir: PathBuf,
    table: String,
    batch_size: usize,
    /// partition → dedupe keys present on disk
    seen: Mutex<HashMap<String, HashSet<String>>>,
    _marker: PhantomData<R>,
}

impl<R: TableRow> PartitionedTable<R> {
    /// Create the table directory and scan existing keys into `seen`.
    pub fn new(base_dir: impl Into<PathBuf>, table: &str, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(anyhow!("batch_size must be at least 1"));
        }
        let base_dir = base_dir.into();
        let table_dir = base_dir.join(table);
        fs::create_dir_all(&table_dir)
            .with_context(|| format!("could not create `{}`", table_dir.display()))?;

        let mut seen: HashMap<String, HashSet<String>> = HashMap::new();
        for part in fs::read_dir(&table_dir)? {
            let part = part?;
            if !part.file_type()?.is_dir() {
                continue;
            }
            let name = part.file_name().to_string_lossy().to_string();
            let keys = seen.entry(name).or_default();
            for row in read_dir_rows::<R>(&part.path())? {
                keys.insert(row.unique_key());
            }
        }
        debug!(table, partitions = seen.len(), "scanned existing keys");

        Ok(Self {
            base_dir,
            table: table.to_string(),
            batch_size,
            seen: Mutex::new(seen),
            _marker: PhantomData,
        })
    }

    fn table_dir(&self) -> PathBuf {
        self.base_dir.join(&self.table)
    }

    fn lock_seen(&self) -> Result<MutexGuard<'_, HashMap<String, HashSet<String>>>> {
        self.seen
            .lock()
            .map_err(|_| anyhow!("key index for `{}` is poisoned", self.table))
    }

    /// Insert rows, skipping any whose key is already stored (or repeated
    /// earlier in `rows`).
    pub fn insert(&self, rows: &[R]) -> Result<InsertSummary>
    where
        R: Clone,
    {
        let mut seen = self.lock_seen()?;
        let mut summary = InsertSummary::default();

        // group fresh rows by partition, preserving input order
        let mut fresh: BTreeMap<String, Vec<R>> = BTreeMap::new();
        let mut fresh_keys: HashMap<String, HashSet<String>> = HashMap::new();
        for row in rows {
            let partition = row.partition();
            let key = row.unique_key();
            let stored = seen.get(&partition).is_some_and(|k| k.contains(&key));
            let pending = fresh_keys.entry(partition.clone()).or_default();
            if stored || !pending.insert(key) {
                summary.duplicates += 1;
                continue;
            }
            fresh.entry(partition).or_default().push(row.clone());
        }

        let ts = Utc::now().timestamp_micros();
        for (partition, part_rows) in &fresh {
            let dir = self.table_dir().join(partition);
            fs::create_dir_all(&dir)
                .with_context(|| format!("could not create `{}`", dir.display()))?;
            for (i, chunk) in part_rows.chunks(self.batch_size).enumerate() {
                let batch = R::to_batch(chunk)?;
                let fname = format!("part-{}-{:05}.parquet", ts, i);
                write_batch(&dir, &fname, &batch)?;
                // remember keys as soon as their file is on disk
                seen.entry(partition.clone())
                    .or_default()
                    .extend(chunk.iter().map(R::unique_key));
                summary.inserted += chunk.len();
            }
        }
        Ok(summary)
    }

    /// Check if a row exists by its partition and dedupe key.
    pub fn contains(&self, partition: &str, key: &str) -> Result<bool> {
        let seen = self.lock_seen()?;
        Ok(seen.get(partition).is_some_and(|k| k.contains(key)))
    }

    /// Remove a whole partition. Returns the number of rows it held.
    pub fn delete_partition(&self, partition: &str) -> Result<usize> {
        let mut seen = self.lock_seen()?;
        let removed = seen.remove(partition).map(|k| k.len()).unwrap_or(0);
        let dir = self.table_dir().join(partition);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to delete `{}`", dir.display()))?;
        }
        info!(table = %self.table, partition, removed, "deleted partition");
        Ok(removed)
    }

    /// Every row in `partition`, in write order. Empty if it does not exist.
    pub fn read_partition(&self, partition: &str) -> Result<Vec<R>> {
        let dir = self.table_dir().join(partition);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        read_dir_rows::<R>(&dir)
    }

    /// Names of all partitions holding at least one row, sorted.
    pub fn partitions(&self) -> Result<Vec<String>> {
        let seen = self.lock_seen()?;
        let mut parts: Vec<String> = seen
            .iter()
            .filter(|(_, keys)| !keys.is_empty())
            .map(|(p, _)| p.clone())
            .collect();
        parts.sort();
        Ok(parts)
    }

    /// Consolidate each partition into one file.
    pub fn vacuum(&self) -> Result<()> {
        // hold the lock so no insert lands mid-consolidation
        let _seen = self.lock_seen()?;
        for part in fs::read_dir(self.table_dir())? {
            let part = part?;
            if !part.file_type()?.is_dir() {
                continue;
            }
            let dir = part.path();

            let files = parquet_files(&dir)?;
            if files.is_empty() {
                continue;
            }

            let tmp = dir.join(format!("{}.tmp", CONSOLIDATED));
            let file = File::create(&tmp)
                .with_context(|| format!("could not create `{}`", tmp.display()))?;
            let mut writer = ArrowWriter::try_new(BufWriter::new(file), R::schema(), Some(props()))
                .context("creating ArrowWriter for consolidated Parquet")?;

            for p in &files {
                let f = File::open(p).with_context(|| format!("failed to open `{}`", p.display()))?;
                let mut reader = ParquetRecordBatchReaderBuilder::try_new(f)?
                    .with_batch_size(1024)
                    .build()?;
                while let Some(batch) = reader.next().transpose()? {
                    writer.write(&batch)?;
                }
            }
            writer
                .close()
                .context("closing ArrowWriter for consolidated Parquet")?;
            let cons = dir.join(CONSOLIDATED);
            fs::rename(&tmp, &cons)
                .with_context(|| format!("renaming `{}` → `{}`", tmp.display(), cons.display()))?;

            for p in files {
                if p.file_name().and_then(|n| n.to_str()) != Some(CONSOLIDATED) {
                    fs::remove_file(&p)
                        .with_context(|| format!("failed to delete file `{}`", p.display()))?;
                }
            }
            debug!(partition = %dir.display(), "vacuumed");
        }
        Ok(())
    }
}

fn props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Write one batch to `<dir>/<fname>` via a `.tmp` file and a rename.
fn write_batch(dir: &Path, fname: &str, batch: &RecordBatch) -> Result<()> {
    let final_path = dir.join(fname);
    let tmp = dir.join(format!("{}.tmp", fname));
    let file =
        File::create(&tmp).with_context(|| format!("could not create `{}`", tmp.display()))?;
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props()))
        .context("creating ArrowWriter")?;
    writer.write(batch).context("writing batch to Parquet")?;
    writer.close().context("closing Parquet writer")?;
    fs::rename(&tmp, &final_path).with_context(|| {
        format!(
            "failed to rename `{}` to `{}`",
            tmp.display(),
            final_path.display()
        )
    })?;
    Ok(())
}

/// `*.parquet` files directly under `dir`, sorted by name. The
/// consolidated file sorts ahead of `part-*` files, so this is write order.
fn parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob(&format!("{}/*.parquet", dir.display()))?
        .filter_map(Result::ok)
        .collect();
    files.sort();
    Ok(files)
}

fn read_dir_rows<R: TableRow>(dir: &Path) -> Result<Vec<R>> {
    let mut rows = Vec::new();
    for path in parquet_files(dir)? {
        let file =
            File::open(&path).with_context(|| format!("failed to open `{}`", path.display()))?;
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("failed to read Parquet `{}`", path.display()))?
            .with_batch_size(1024)
            .build()?;
        while let Some(batch) = reader
            .next()
            .transpose()
            .with_context(|| format!("error reading RecordBatch from `{}`", path.display()))?
        {
            rows.extend(R::from_batch(&batch)?);
        }
    }
    Ok(rows)
}
