//! Tabix-indexed VCF access through htslib

use crate::{
    vcf::{read_columns, VariantSource, VariantStream, VcfLayout},
    TrioError, TrioResult,
};
use rust_htslib::tbx::{self, Read as TbxRead};
use std::path::{Path, PathBuf};

/// Largest coordinate htslib accepts as a region end (HTS_POS_MAX)
const FETCH_END: u64 = ((i32::MAX as u64) << 32) | i32::MAX as u64;

/// Reader over a bgzipped VCF with a `.tbi`/`.csi` index
pub struct TabixVcfReader {
    path: PathBuf,
    layout: VcfLayout,
    reader: tbx::Reader,
}

impl TabixVcfReader {
    pub fn open<P: AsRef<Path>>(path: P, samples: &[&str]) -> TrioResult<Self> {
        let path = path.as_ref().to_path_buf();
        let columns = read_columns(&path)?;
        let layout = VcfLayout::from_columns(columns, samples, &path)?;
        let reader = tbx::Reader::from_path(&path)?;

        Ok(TabixVcfReader {
            path,
            layout,
            reader,
        })
    }
}

impl VariantSource for TabixVcfReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn layout(&self) -> &VcfLayout {
        &self.layout
    }

    fn contigs(&mut self) -> TrioResult<Vec<String>> {
        Ok(self.reader.seqnames())
    }

    fn stream(&mut self, contig: &str) -> TrioResult<VariantStream<'_>> {
        let tid = self
            .reader
            .tid(contig)
            .map_err(|_| TrioError::MissingContig(contig.to_string()))?;
        self.reader
            .fetch(tid, 0, FETCH_END)
            .map_err(|_| TrioError::MissingContig(contig.to_string()))?;

        let layout = &self.layout;
        let records = self.reader.records().filter_map(move |raw| {
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => return Some(Err(TrioError::Htslib(e))),
            };
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(&['\n', '\r'][..]);
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match layout.parse_record(line) {
                Ok(record) => Some(Ok(record)),
                Err(e) => {
                    log::warn!("Skipping invalid VCF record: {}", e);
                    None
                }
            }
        });

        Ok(Box::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::find_tabix_index;
    use crate::vcf::tests::{write_vcf, HEADER};
    use crate::vcf::{open_variant_source, ScanVcfReader, VariantRecord};
    use rust_htslib::bcf::index;
    use rust_htslib::bgzf;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLES: [&str; 3] = ["kid", "dad", "mom"];

    /// bgzip `lines` under a VCF header into `dir` and build a `.tbi` next to it
    fn write_indexed_vcf(dir: &TempDir, lines: &[&[u8]]) -> PathBuf {
        let path = dir.path().join("trio.vcf.gz");
        {
            let mut writer = bgzf::Writer::from_path(&path).unwrap();
            writeln!(writer, "##fileformat=VCFv4.2").unwrap();
            writeln!(writer, "{}", HEADER).unwrap();
            for line in lines {
                writer.write_all(line).unwrap();
                writer.write_all(b"\n").unwrap();
            }
            writer.flush().unwrap();
        }
        index::build(&path, None, 1, index::Type::Tbx).unwrap();
        path
    }

    fn indexed_trio(dir: &TempDir) -> PathBuf {
        write_indexed_vcf(
            dir,
            &[
                b"2\t10\t.\tA\tT\t.\tPASS\t.\tGT:GQ:AD\t0/1:99:10,10\t0/0:99:20,0\t1/1:99:0,20",
                b"2\t20\t.\tC\tG\t.\tPASS\tNOTE=caf\xe9\tGT:GQ:AD\t0/1:99:12,8\t1/1:99:0,20\t0/0:99:20,0",
                b"1\t5\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1",
                b"1\t7\t.\tG\tA\t.\tPASS\t.\tGT",
                b"X\t5\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t",
            ],
        )
    }

    fn collect(source: &mut dyn VariantSource, contig: &str) -> Vec<VariantRecord> {
        source
            .stream(contig)
            .unwrap()
            .collect::<TrioResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_fetch_end_is_hts_pos_max() {
        assert_eq!(FETCH_END, 0x7fff_ffff_7fff_ffff);
    }

    #[test]
    fn test_open_without_index_fails() {
        // A plain-text VCF has no index for htslib to load
        let vcf = write_vcf(&["1\t5\t.\tG\tA\t.\tPASS\t.\tGT\t0/1\t0/0\t1/1"]);
        assert!(TabixVcfReader::open(vcf.path(), &["kid", "dad", "mom"]).is_err());
    }

    #[test]
    fn test_open_checks_columns_first() {
        let vcf = write_vcf(&[]);
        assert!(matches!(
            TabixVcfReader::open(vcf.path(), &["grandma"]),
            Err(TrioError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_indexed_contigs_in_index_order() {
        let dir = TempDir::new().unwrap();
        let path = indexed_trio(&dir);
        assert!(find_tabix_index(&path).is_some());

        let mut reader = TabixVcfReader::open(&path, &SAMPLES).unwrap();
        assert_eq!(reader.path(), path.as_path());
        assert_eq!(reader.columns().len(), 12);
        assert_eq!(reader.contigs().unwrap(), vec!["2", "1", "X"]);
    }

    #[test]
    fn test_indexed_stream_matches_scan() {
        let dir = TempDir::new().unwrap();
        let path = indexed_trio(&dir);
        let mut indexed = TabixVcfReader::open(&path, &SAMPLES).unwrap();
        let mut scan = ScanVcfReader::open(&path, &SAMPLES).unwrap();

        for contig in ["2", "1", "X"] {
            assert_eq!(collect(&mut indexed, contig), collect(&mut scan, contig), "contig {}", contig);
        }

        let records = collect(&mut indexed, "2");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].pos, 20);
        assert_eq!(records[1].sample("kid"), Some("0/1:99:12,8"));

        // Truncated line skipped, empty trailing sample kept
        assert_eq!(collect(&mut indexed, "1").len(), 1);
        let records = collect(&mut indexed, "X");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sample("mom"), Some(""));
    }

    #[test]
    fn test_indexed_unknown_contig() {
        let dir = TempDir::new().unwrap();
        let path = indexed_trio(&dir);
        let mut reader = TabixVcfReader::open(&path, &SAMPLES).unwrap();
        assert!(matches!(
            reader.stream("Z"),
            Err(TrioError::MissingContig(contig)) if contig == "Z"
        ));
        // The reader is still usable after a failed lookup
        assert_eq!(collect(&mut reader, "1").len(), 1);
    }

    #[test]
    fn test_open_variant_source_prefers_index() {
        let dir = TempDir::new().unwrap();
        let path = indexed_trio(&dir);
        let mut source = open_variant_source(&path, &SAMPLES).unwrap();
        assert_eq!(source.contigs().unwrap(), vec!["2", "1", "X"]);
        // Only the indexed reader reports contigs absent from the file
        assert!(matches!(source.stream("Z"), Err(TrioError::MissingContig(_))));
    }
}
