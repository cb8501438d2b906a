use super::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub province: usize,
    pub district: usize,
    pub commune: usize,
}

impl TypeCounts {
    fn record(&mut self, location_type: LocationType) {
        match location_type {
            LocationType::Province => self.province += 1,
            LocationType::District => self.district += 1,
            LocationType::Commune => self.commune += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.province + self.district + self.commune
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatternCounts {
    pub row_numbered: usize,
    pub bare: usize,
    pub embedded: usize,
}

impl PatternCounts {
    fn record(&mut self, pattern: LinePattern) {
        match pattern {
            LinePattern::RowNumbered => self.row_numbered += 1,
            LinePattern::Bare => self.bare += 1,
            LinePattern::Embedded => self.embedded += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub entries: Vec<LocationEntry>,
    pub stats: TypeCounts,
    pub pattern_counts: PatternCounts,
    pub fallbacks: AncestorFallbacks,
    pub pages: Vec<PageReport>,
    pub lines_seen: usize,
    pub lines_skipped: usize,
    pub entries_before_dedupe: usize,
    pub warnings: Vec<String>,
}

impl PipelineOutput {
    pub fn ocr_failed_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.status == PageStatus::OcrFailed)
            .count()
    }
}

#[derive(Debug)]
pub struct PipelineDriver {
    parser: LineParser,
}

impl PipelineDriver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: LineParser::new()?,
        })
    }

    /// Reads `pages` strictly in the given order from a fresh hierarchy
    /// context, so one driver can serve independent runs.
    pub fn run(&self, pages: &[PathBuf], ocr: &dyn OcrSource) -> PipelineOutput {
        let mut context = HierarchyContext::default();
        self.run_with_context(pages, ocr, &mut context)
    }

    /// Like [`PipelineDriver::run`], leaving the final context with the caller.
    /// The context is reset before the first page.
    pub fn run_with_context(
        &self,
        pages: &[PathBuf],
        ocr: &dyn OcrSource,
        context: &mut HierarchyContext,
    ) -> PipelineOutput {
        context.reset();
        let mut output = PipelineOutput::default();
        let mut accumulated = Vec::new();

        for (index, page) in pages.iter().enumerate() {
            let page_name = page
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| page.display().to_string());

            let text = match ocr.text_for_page(page) {
                Ok(text) => text,
                Err(err) => {
                    warn!(page = %page_name, error = %err, "OCR failed; skipping page");
                    output
                        .warnings
                        .push(format!("OCR failed for {page_name}: {err}"));
                    output.pages.push(PageReport {
                        page: page_name,
                        status: PageStatus::OcrFailed,
                        lines_seen: 0,
                        entries: 0,
                        current_province: context.current_province_name_en.clone(),
                        error: Some(format!("{err:#}")),
                    });
                    continue;
                }
            };

            let mut lines_seen = 0;
            let mut page_entries = 0;
            for line in text.lines() {
                lines_seen += 1;
                let Some((pattern, record)) = self.parser.parse_with_pattern(line) else {
                    output.lines_skipped += 1;
                    continue;
                };

                let entry = classify(record, context);
                debug!(
                    postal_code = %entry.postal_code,
                    location_type = entry.location_type.as_str(),
                    pattern = pattern.as_str(),
                    "classified row"
                );
                output.pattern_counts.record(pattern);
                output.stats.record(entry.location_type);
                accumulated.push(entry);
                page_entries += 1;
            }

            output.lines_seen += lines_seen;
            info!(
                page = %page_name,
                progress = %format!("{}/{}", index + 1, pages.len()),
                entries = page_entries,
                province = %display_province(context),
                "processed page"
            );
            output.pages.push(PageReport {
                page: page_name,
                status: PageStatus::Processed,
                lines_seen,
                entries: page_entries,
                current_province: context.current_province_name_en.clone(),
                error: None,
            });
        }

        output.entries_before_dedupe = accumulated.len();
        output.entries = dedupe(accumulated);
        output.fallbacks = context.fallbacks;

        if output.fallbacks.total() > 0 {
            warn!(
                district_without_province = output.fallbacks.district_without_province,
                commune_without_province = output.fallbacks.commune_without_province,
                commune_without_district = output.fallbacks.commune_without_district,
                "ancestor codes derived from child codes; pages may be missing or out of order"
            );
        }

        output
    }
}

fn display_province(context: &HierarchyContext) -> &str {
    if context.current_province_name_en.is_empty() {
        "N/A"
    } else {
        &context.current_province_name_en
    }
}
