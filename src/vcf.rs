//! VCF column layout, variant records and readers

use crate::{tabix::TabixVcfReader, utils::find_tabix_index, TrioError, TrioResult};
use flate2::read::MultiGzDecoder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Columns every record must carry besides the requested samples
pub const REQUIRED_COLUMNS: [&str; 5] = ["CHROM", "POS", "REF", "ALT", "FORMAT"];

/// Column indices resolved from the `#CHROM` header line
#[derive(Debug, Clone)]
pub struct VcfLayout {
    columns: Vec<String>,
    chrom: usize,
    pos: usize,
    ref_allele: usize,
    alt: usize,
    format: usize,
    samples: Vec<(String, usize)>,
    min_fields: usize,
}

impl VcfLayout {
    /// Resolve the required columns, failing on the first one absent from `columns`
    pub fn from_columns(columns: Vec<String>, samples: &[&str], path: &Path) -> TrioResult<Self> {
        let find = |name: &str| -> TrioResult<usize> {
            columns
                .iter()
                .position(|col| col == name)
                .ok_or_else(|| TrioError::MissingColumn {
                    column: name.to_string(),
                    path: path.to_path_buf(),
                })
        };

        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name)?;
        }
        let [chrom, pos, ref_allele, alt, format] = required;

        let mut sample_indices = Vec::with_capacity(samples.len());
        for sample in samples {
            if sample_indices.iter().any(|(s, _): &(String, usize)| s == sample) {
                continue;
            }
            sample_indices.push((sample.to_string(), find(*sample)?));
        }

        let min_fields = [chrom, pos, ref_allele, alt, format]
            .into_iter()
            .chain(sample_indices.iter().map(|(_, i)| *i))
            .max()
            .unwrap_or(0)
            + 1;

        Ok(VcfLayout {
            columns,
            chrom,
            pos,
            ref_allele,
            alt,
            format,
            samples: sample_indices,
            min_fields,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Split a data line into a record holding only the requested samples
    pub fn parse_record(&self, line: &str) -> TrioResult<VariantRecord> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < self.min_fields {
            return Err(TrioError::InvalidRecord(format!(
                "expected at least {} columns, found {}: {}",
                self.min_fields,
                fields.len(),
                line
            )));
        }

        let pos = fields[self.pos]
            .parse::<u64>()
            .map_err(|_| TrioError::InvalidRecord(format!("Invalid position: {}", fields[self.pos])))?;

        let samples = self
            .samples
            .iter()
            .map(|(label, i)| (label.clone(), fields[*i].to_string()))
            .collect();

        Ok(VariantRecord {
            chrom: fields[self.chrom].to_string(),
            pos,
            ref_allele: fields[self.ref_allele].to_string(),
            alt_alleles: fields[self.alt].split(',').map(str::to_string).collect(),
            format: fields[self.format].split(':').map(str::to_string).collect(),
            samples,
        })
    }
}

/// One data line of a VCF, restricted to the samples of interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt_alleles: Vec<String>,
    pub format: Vec<String>,
    pub samples: HashMap<String, String>,
}

impl VariantRecord {
    /// Single-base REF with exactly one single-base ALT
    pub fn is_biallelic_snp(&self) -> bool {
        self.ref_allele.len() == 1 && self.alt_alleles.len() == 1 && self.alt_alleles[0].len() == 1
    }

    pub fn is_multiallelic(&self) -> bool {
        self.alt_alleles.len() > 1
    }

    /// Raw colon-delimited value of a sample column
    pub fn sample(&self, label: &str) -> Option<&str> {
        self.samples.get(label).map(String::as_str)
    }
}

/// Lazy, single-pass stream of records for one contig
pub type VariantStream<'a> = Box<dyn Iterator<Item = TrioResult<VariantRecord>> + 'a>;

/// Random-access view over a VCF: list contigs, then stream one contig at a time
pub trait VariantSource {
    fn path(&self) -> &Path;

    fn layout(&self) -> &VcfLayout;

    /// Contig names in file/index order
    fn contigs(&mut self) -> TrioResult<Vec<String>>;

    /// Records of `contig` in stored coordinate order
    fn stream(&mut self, contig: &str) -> TrioResult<VariantStream<'_>>;

    fn columns(&self) -> &[String] {
        self.layout().columns()
    }
}

/// Check if a file is gzipped
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> TrioResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(TrioError::Io(e)),
    }
}

/// Open a plain or (b)gzipped text file for line reading
pub fn open_text<P: AsRef<Path>>(path: P) -> TrioResult<Box<dyn BufRead>> {
    let file = File::open(&path)
        .map_err(|_| TrioError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(reader)
}

/// Next line of `reader` without its terminator, invalid UTF-8 replaced
pub fn next_line(reader: &mut dyn BufRead, buf: &mut Vec<u8>) -> TrioResult<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf.as_slice());
    Ok(Some(line.trim_end_matches(&['\n', '\r'][..]).to_string()))
}

/// Column names from the `#CHROM` header line, without the leading `#`
pub fn read_columns<P: AsRef<Path>>(path: P) -> TrioResult<Vec<String>> {
    let mut reader = open_text(&path)?;
    let mut buf = Vec::new();

    while let Some(line) = next_line(reader.as_mut(), &mut buf)? {
        if let Some(header) = line.strip_prefix("#CHROM") {
            let mut columns = vec!["CHROM".to_string()];
            columns.extend(
                header
                    .trim_end()
                    .split('\t')
                    .skip(1)
                    .map(str::to_string),
            );
            return Ok(columns);
        }
        if !line.starts_with('#') {
            break;
        }
    }

    Err(TrioError::MissingHeader(path.as_ref().to_path_buf()))
}

/// Open `path` with the tabix reader when an index is present, otherwise scan it
pub fn open_variant_source<P: AsRef<Path>>(
    path: P,
    samples: &[&str],
) -> TrioResult<Box<dyn VariantSource>> {
    let path = path.as_ref();
    match find_tabix_index(path) {
        Some(index) => {
            log::info!("Using tabix index {:?}", index);
            Ok(Box::new(TabixVcfReader::open(path, samples)?))
        }
        None => {
            log::info!("No tabix index next to {:?}, scanning the whole file", path);
            Ok(Box::new(ScanVcfReader::open(path, samples)?))
        }
    }
}

/// Reader that answers contig queries by scanning the file sequentially
pub struct ScanVcfReader {
    path: PathBuf,
    layout: VcfLayout,
}

impl ScanVcfReader {
    pub fn open<P: AsRef<Path>>(path: P, samples: &[&str]) -> TrioResult<Self> {
        let path = path.as_ref().to_path_buf();
        let columns = read_columns(&path)?;
        let layout = VcfLayout::from_columns(columns, samples, &path)?;
        Ok(ScanVcfReader { path, layout })
    }
}

impl VariantSource for ScanVcfReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn layout(&self) -> &VcfLayout {
        &self.layout
    }

    fn contigs(&mut self) -> TrioResult<Vec<String>> {
        let mut reader = open_text(&self.path)?;
        let mut buf = Vec::new();
        let mut seen = HashSet::new();
        let mut contigs = Vec::new();

        while let Some(line) = next_line(reader.as_mut(), &mut buf)? {
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            let chrom = line.split('\t').next().unwrap_or_default();
            if !seen.contains(chrom) {
                seen.insert(chrom.to_string());
                contigs.push(chrom.to_string());
            }
        }

        Ok(contigs)
    }

    fn stream(&mut self, contig: &str) -> TrioResult<VariantStream<'_>> {
        Ok(Box::new(ScanRecordIterator {
            reader: open_text(&self.path)?,
            layout: &self.layout,
            contig: contig.to_string(),
            buf: Vec::new(),
        }))
    }
}

/// Iterator over the data lines of one contig
struct ScanRecordIterator<'a> {
    reader: Box<dyn BufRead>,
    layout: &'a VcfLayout,
    contig: String,
    buf: Vec<u8>,
}

impl<'a> Iterator for ScanRecordIterator<'a> {
    type Item = TrioResult<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match next_line(self.reader.as_mut(), &mut self.buf) {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if line.split('\t').next() != Some(self.contig.as_str()) {
                continue;
            }
            match self.layout.parse_record(&line) {
                Ok(record) => return Some(Ok(record)),
                Err(e) => log::warn!("Skipping invalid VCF record: {}", e),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) const HEADER: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tkid\tdad\tmom";

    pub(crate) fn write_vcf(lines: &[&str]) -> NamedTempFile {
        let lines: Vec<&[u8]> = lines.iter().map(|line| line.as_bytes()).collect();
        write_vcf_bytes(&[], &lines)
    }

    /// Same as `write_vcf`, with raw bytes and extra `##` lines before the header
    pub(crate) fn write_vcf_bytes(meta: &[&[u8]], lines: &[&[u8]]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        let header = HEADER.as_bytes();
        for line in meta.iter().chain(std::iter::once(&header)).chain(lines) {
            temp_file.write_all(line).unwrap();
            temp_file.write_all(b"\n").unwrap();
        }
        temp_file.flush().unwrap();
        temp_file
    }

    fn collect(source: &mut dyn VariantSource, contig: &str) -> Vec<VariantRecord> {
        source
            .stream(contig)
            .unwrap()
            .collect::<TrioResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_read_columns() {
        let vcf = write_vcf(&[]);
        let columns = read_columns(vcf.path()).unwrap();
        assert_eq!(columns[0], "CHROM");
        assert_eq!(columns[8], "FORMAT");
        assert_eq!(&columns[9..], ["kid", "dad", "mom"]);
    }

    #[test]
    fn test_read_columns_gzipped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        {
            let mut encoder = GzEncoder::new(temp_file.as_file_mut(), Compression::default());
            writeln!(encoder, "##fileformat=VCFv4.2").unwrap();
            writeln!(encoder, "{}", HEADER).unwrap();
            encoder.finish().unwrap();
        }
        assert!(is_gzipped(temp_file.path()).unwrap());
        let columns = read_columns(temp_file.path()).unwrap();
        assert_eq!(columns.len(), 12);
    }

    #[test]
    fn test_missing_header() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(temp_file, "1\t100\t.\tA\tT").unwrap();
        assert!(matches!(
            read_columns(temp_file.path()),
            Err(TrioError::MissingHeader(_))
        ));
    }

    #[test]
    fn test_missing_sample_column() {
        let vcf = write_vcf(&[]);
        match ScanVcfReader::open(vcf.path(), &["kid", "uncle"]) {
            Err(TrioError::MissingColumn { column, path }) => {
                assert_eq!(column, "uncle");
                assert_eq!(path, vcf.path());
            }
            other => panic!("expected missing column, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_format_column() {
        let columns = ["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = VcfLayout::from_columns(columns, &[], Path::new("sites.vcf")).unwrap_err();
        assert!(err.to_string().contains("\"FORMAT\""));
        assert!(err.to_string().contains("sites.vcf"));
    }

    #[test]
    fn test_parse_record() {
        let vcf = write_vcf(&[]);
        let reader = ScanVcfReader::open(vcf.path(), &["kid", "mom"]).unwrap();
        let record = reader
            .layout()
            .parse_record("chr1\t100\t.\tA\tT,G\t50\tPASS\t.\tGT:GQ:AD\t0/1:30:5,5\t0/0:40:9,0\t1/1:20:0,8")
            .unwrap();

        assert_eq!(record.chrom, "chr1");
        assert_eq!(record.pos, 100);
        assert_eq!(record.alt_alleles, vec!["T", "G"]);
        assert_eq!(record.format, vec!["GT", "GQ", "AD"]);
        assert_eq!(record.sample("kid"), Some("0/1:30:5,5"));
        assert_eq!(record.sample("mom"), Some("1/1:20:0,8"));
        assert_eq!(record.sample("dad"), None);
        assert!(record.is_multiallelic());
        assert!(!record.is_biallelic_snp());
    }

    #[test]
    fn test_parse_record_errors() {
        let vcf = write_vcf(&[]);
        let reader = ScanVcfReader::open(vcf.path(), &["kid", "dad", "mom"]).unwrap();
        assert!(reader.layout().parse_record("1\t100\t.\tA\tT").is_err());
        assert!(reader
            .layout()
            .parse_record("1\tabc\t.\tA\tT\t.\t.\t.\tGT\t0/0\t0/0\t0/0")
            .is_err());
    }

    #[test]
    fn test_biallelic_snp() {
        let record = |r: &str, a: &str| VariantRecord {
            chrom: "1".to_string(),
            pos: 1,
            ref_allele: r.to_string(),
            alt_alleles: a.split(',').map(str::to_string).collect(),
            format: vec!["GT".to_string()],
            samples: HashMap::new(),
        };
        assert!(record("A", "G").is_biallelic_snp());
        assert!(!record("AT", "G").is_biallelic_snp());
        assert!(!record("A", "GT").is_biallelic_snp());
        assert!(!record("A", "G,T").is_biallelic_snp());
    }

    #[test]
    fn test_scan_reader_contigs_and_stream() {
        let vcf = write_vcf(&[
            "2\t10\t.\tA\tT\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1",
            "2\t20\t.\tC\tG\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1",
            "1\t5\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1",
            "1\t7\t.\tG\tA\t.\tPASS\t.\tGT",
            "X\t5\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1",
        ]);
        let mut reader = ScanVcfReader::open(vcf.path(), &["kid", "dad", "mom"]).unwrap();
        assert_eq!(reader.contigs().unwrap(), vec!["2", "1", "X"]);

        let records = collect(&mut reader, "2");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pos, 10);
        assert_eq!(records[1].pos, 20);

        // The truncated line on contig 1 is skipped
        let records = collect(&mut reader, "1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pos, 5);

        assert!(collect(&mut reader, "MT").is_empty());
    }

    #[test]
    fn test_scan_reader_tolerates_invalid_utf8() {
        let vcf = write_vcf_bytes(
            &[b"##source=caf\xe9"],
            &[
                b"1\t5\t.\tG\tA\t.\tPASS\tNOTE=caf\xe9\tGT\t0/1\t0/0\t1/1",
                b"1\t9\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1\r",
                b"\xff\t3\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1",
            ],
        );
        assert_eq!(read_columns(vcf.path()).unwrap().len(), 12);

        let mut reader = ScanVcfReader::open(vcf.path(), &["kid", "dad", "mom"]).unwrap();
        assert_eq!(reader.contigs().unwrap(), vec!["1", "\u{fffd}"]);

        let records = collect(&mut reader, "1");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pos, 5);
        assert_eq!(records[1].sample("mom"), Some("1/1"));
    }

    #[test]
    fn test_trailing_empty_column_is_kept() {
        let vcf = write_vcf(&["1\t5\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t"]);
        let mut reader = ScanVcfReader::open(vcf.path(), &["kid", "dad", "mom"]).unwrap();
        let records = collect(&mut reader, "1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sample("mom"), Some(""));
    }

    #[test]
    fn test_open_variant_source_without_index() {
        let vcf = write_vcf(&["1\t5\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1"]);
        let mut source = open_variant_source(vcf.path(), &["kid"]).unwrap();
        assert_eq!(source.path(), vcf.path());
        assert_eq!(source.columns().len(), 12);
        assert_eq!(source.contigs().unwrap(), vec!["1"]);
    }
}
